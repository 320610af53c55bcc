//! # Livepad Workspace
//!
//! Everything between an edit and the rendered preview, plus the pieces that
//! keep a session around: autosave, snippets, config and the HTTP server.
//!
//! ```text
//! SourceBufferStore ─► Trigger ─(quiet window)─► compose ─► watch ─► SandboxRenderer
//! ```

pub mod autosave;
pub mod config;
pub mod notice;
pub mod persistence;
pub mod sandbox;
pub mod scheduler;
pub mod server;
pub mod snippets;
pub mod watcher;
mod workspace;

use livepad_editor::EditSession;
use std::sync::{Arc, Mutex};

/// Session shared between request handlers and background tasks.
/// Never held across an `.await`.
pub type SharedSession = Arc<Mutex<EditSession>>;

pub use autosave::{Autosaver, DEFAULT_AUTOSAVE_DEBOUNCE};
pub use config::{ConfigError, LivepadConfig, DEFAULT_CONFIG_NAME};
pub use notice::{Notice, NoticeLevel, Notifier};
pub use persistence::{
    FileStore, KeyValueStore, LocalPersistence, MemoryStore, PersistenceError, SESSION_KEY,
};
pub use sandbox::{host_page, BroadcastRenderer, RecordingRenderer, SandboxPolicy, SandboxRenderer};
pub use scheduler::{Debouncer, PreviewScheduler, PublishedPreview, Trigger, DEFAULT_PREVIEW_DEBOUNCE};
pub use server::{router, serve, serve_on, ServerError};
pub use snippets::{
    FileSnippetStore, MemorySnippetStore, NewSnippet, SavedSnippet, SnippetError, SnippetStore,
};
pub use watcher::{watch_sources, SourceFiles, WatchHandle, WatcherError, WatcherResult};
pub use workspace::{Workspace, WorkspaceError, WorkspaceResult};
