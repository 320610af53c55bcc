//! # Local Persistence
//!
//! Durable key-value storage for the editing session. The whole session is
//! stored as one JSON blob under [`SESSION_KEY`].

use livepad_editor::{EditorError, SessionSnapshot};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Key holding the serialized session
pub const SESSION_KEY: &str = "livepad.session";

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("Corrupt session data: {0}")]
    Corrupt(#[from] EditorError),

    #[error("Storage task failed: {0}")]
    Task(String),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Minimal get/put/delete contract, modelled on browser local storage
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> PersistenceResult<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> PersistenceResult<()>;
    fn remove_item(&self, key: &str) -> PersistenceResult<()>;
}

/// Non-durable store
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> PersistenceResult<Option<String>> {
        Ok(self
            .items
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> PersistenceResult<()> {
        self.items
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> PersistenceResult<()> {
        self.items
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }
}

/// One file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> PersistenceResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PersistenceResult<PathBuf> {
        if !is_valid_key(key) {
            return Err(PersistenceError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> PersistenceResult<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> PersistenceResult<()> {
        let path = self.path_for(key)?;
        write_atomic(&path, value.as_bytes())
    }

    fn remove_item(&self, key: &str) -> PersistenceResult<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Keys and user ids end up in file names
pub(crate) fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

/// Write through a uniquely named sibling temp file so readers never see
/// half a value and concurrent writers never share a temp path
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> PersistenceResult<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Session save/restore over a [`KeyValueStore`]
///
/// Saves are ordered by sequence number. A snapshot taken before one that
/// is already on disk is dropped instead of overwriting it.
#[derive(Clone)]
pub struct LocalPersistence {
    store: Arc<dyn KeyValueStore>,
    sequence: Arc<AtomicU64>,
    last_written: Arc<Mutex<u64>>,
}

impl LocalPersistence {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            sequence: Arc::new(AtomicU64::new(0)),
            last_written: Arc::new(Mutex::new(0)),
        }
    }

    /// Claim the sequence number for a snapshot about to be taken
    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Write `snapshot` unless a later one has been written already.
    /// Returns whether it was written.
    pub fn save_sequenced(&self, sequence: u64, snapshot: &SessionSnapshot) -> PersistenceResult<bool> {
        let mut last = self.last_written.lock().unwrap_or_else(|e| e.into_inner());
        if sequence < *last {
            tracing::debug!(sequence, last = *last, "dropping stale session save");
            return Ok(false);
        }
        let json = snapshot.to_json()?;
        self.store.set_item(SESSION_KEY, &json)?;
        *last = sequence;
        Ok(true)
    }

    pub fn load(&self) -> PersistenceResult<Option<SessionSnapshot>> {
        match self.store.get_item(SESSION_KEY)? {
            Some(json) => Ok(Some(SessionSnapshot::from_json(&json)?)),
            None => Ok(None),
        }
    }

    pub fn save(&self, snapshot: &SessionSnapshot) -> PersistenceResult<()> {
        self.save_sequenced(self.next_sequence(), snapshot).map(|_| ())
    }

    pub fn clear(&self) -> PersistenceResult<()> {
        self.store.remove_item(SESSION_KEY)
    }

    /// Best-effort restore: defaults when nothing is stored or the stored
    /// value cannot be read
    pub fn restore(&self) -> SessionSnapshot {
        match self.load() {
            Ok(Some(snapshot)) => {
                tracing::info!(name = ?snapshot.current_name, "restored session");
                snapshot
            }
            Ok(None) => SessionSnapshot::default(),
            Err(e) => {
                tracing::warn!(error = %e, "could not restore session, starting empty");
                SessionSnapshot::default()
            }
        }
    }
}
