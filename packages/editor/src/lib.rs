//! # Livepad Editor
//!
//! State owned by a single editing session.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ SourceBufferStore                           │
//! │  - markup / styles / script buffers         │
//! │  - library toggles                          │
//! │  - synchronous change observers             │
//! └─────────────────────────────────────────────┘
//!                     ↓ (observers)
//! ┌─────────────────────────────────────────────┐
//! │ workspace: preview scheduler, autosave      │
//! └─────────────────────────────────────────────┘
//!
//! EditorSettings, LayoutManager: orthogonal to the render path
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use livepad_composer::LibraryRegistry;
//! use livepad_editor::{BufferKind, EditSession};
//! use std::sync::Arc;
//!
//! let mut session = EditSession::new(Arc::new(LibraryRegistry::builtin()));
//! session.store_mut().set_buffer(BufferKind::Markup, "<h1>Hi</h1>");
//! session.store_mut().set_library("jQuery", true).unwrap();
//!
//! let json = session.snapshot().to_json().unwrap();
//! assert!(json.contains("<h1>Hi</h1>"));
//! ```

mod buffers;
mod errors;
pub mod layout;
mod session;
pub mod settings;

pub use buffers::{BufferChange, BufferKind, SourceBufferStore, SourceBuffers, SubscriptionId};
pub use errors::EditorError;
pub use layout::{DeviceClass, LayoutManager, LayoutMode, LayoutState, Point, PointerKind};
pub use session::{EditSession, SessionSnapshot};
pub use settings::EditorSettings;

// Re-export composer types for convenience
pub use livepad_composer::{LibraryRegistry, LibraryToggleSet};
