//! # Livepad Composer
//!
//! Turns the three editor buffers plus the enabled CDN libraries into a
//! single HTML document for the preview sandbox.
//!
//! ```text
//! markup ──┐
//! styles ──┼──► DocumentComposer ──► <html><head><style>…</style>{libs}</head>
//! script ──┤         ▲                 <body>{markup}<script>…</script></body></html>
//! toggles ─┘         │
//!              LibraryRegistry (catalog order)
//! ```
//!
//! Composition is pure: no I/O, no escaping, no failure path.

mod composer;
pub mod registry;
mod toggles;


pub use composer::{ComposedDocument, DocumentComposer};
pub use registry::{LibraryEntry, LibraryRegistry, RegistryError};
pub use toggles::LibraryToggleSet;
