//! Error types for the editor

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Library error: {0}")]
    Library(#[from] livepad_composer::RegistryError),

    #[error("Unknown buffer: {0}")]
    UnknownBuffer(String),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}
