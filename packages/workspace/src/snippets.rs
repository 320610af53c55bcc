//! # Snippet Storage
//!
//! Named snapshots of the three buffers, scoped per user. The contract is
//! list / get / create / delete; snippets are never updated in place.

use crate::persistence::{is_valid_key, write_atomic, PersistenceError};
use chrono::{DateTime, Utc};
use livepad_editor::SourceBuffers;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, RwLock};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum SnippetError {
    #[error("Snippet not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid user id: {0:?}")]
    InvalidUser(String),

    #[error("Snippet name must not be empty")]
    EmptyName,

    #[error("Storage error: {0}")]
    Storage(#[from] PersistenceError),

    #[error("Corrupt snippet file: {0}")]
    Corrupt(#[from] serde_json::Error),
}

impl From<std::io::Error> for SnippetError {
    fn from(e: std::io::Error) -> Self {
        SnippetError::Storage(PersistenceError::Io(e))
    }
}

pub type SnippetResult<T> = Result<T, SnippetError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSnippet {
    pub id: Uuid,
    pub name: String,
    pub markup: String,
    pub styles: String,
    pub script: String,
    pub created_at: DateTime<Utc>,
    pub user_id: String,
}

impl SavedSnippet {
    pub fn buffers(&self) -> SourceBuffers {
        SourceBuffers::new(&self.markup, &self.styles, &self.script)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSnippet {
    pub user_id: String,
    pub name: String,
    #[serde(flatten)]
    pub buffers: SourceBuffers,
}

impl NewSnippet {
    fn into_saved(self) -> SnippetResult<SavedSnippet> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(SnippetError::EmptyName);
        }
        check_user(&self.user_id)?;
        Ok(SavedSnippet {
            id: Uuid::new_v4(),
            name: name.to_string(),
            markup: self.buffers.markup,
            styles: self.buffers.styles,
            script: self.buffers.script,
            created_at: Utc::now(),
            user_id: self.user_id,
        })
    }
}

fn check_user(user_id: &str) -> SnippetResult<()> {
    if is_valid_key(user_id) {
        Ok(())
    } else {
        Err(SnippetError::InvalidUser(user_id.to_string()))
    }
}

/// Remote snippet collection. Calls may block; async callers run them on
/// the blocking pool.
pub trait SnippetStore: Send + Sync {
    /// Newest first
    fn list_by_user(&self, user_id: &str) -> SnippetResult<Vec<SavedSnippet>>;
    fn get(&self, user_id: &str, id: Uuid) -> SnippetResult<SavedSnippet>;
    fn create(&self, snippet: NewSnippet) -> SnippetResult<SavedSnippet>;
    fn delete(&self, user_id: &str, id: Uuid) -> SnippetResult<()>;
}

fn newest_first(snippets: &mut [SavedSnippet]) {
    snippets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[derive(Debug, Default)]
pub struct MemorySnippetStore {
    rows: RwLock<HashMap<String, Vec<SavedSnippet>>>,
}

impl MemorySnippetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnippetStore for MemorySnippetStore {
    fn list_by_user(&self, user_id: &str) -> SnippetResult<Vec<SavedSnippet>> {
        check_user(user_id)?;
        let mut snippets = self
            .rows
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(user_id)
            .cloned()
            .unwrap_or_default();
        newest_first(&mut snippets);
        Ok(snippets)
    }

    fn get(&self, user_id: &str, id: Uuid) -> SnippetResult<SavedSnippet> {
        check_user(user_id)?;
        self.rows
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(user_id)
            .and_then(|rows| rows.iter().find(|s| s.id == id).cloned())
            .ok_or(SnippetError::NotFound(id))
    }

    fn create(&self, snippet: NewSnippet) -> SnippetResult<SavedSnippet> {
        let saved = snippet.into_saved()?;
        self.rows
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(saved.user_id.clone())
            .or_default()
            .push(saved.clone());
        Ok(saved)
    }

    fn delete(&self, user_id: &str, id: Uuid) -> SnippetResult<()> {
        check_user(user_id)?;
        let mut rows = self.rows.write().unwrap_or_else(|e| e.into_inner());
        let user_rows = rows.get_mut(user_id).ok_or(SnippetError::NotFound(id))?;
        let before = user_rows.len();
        user_rows.retain(|s| s.id != id);
        if user_rows.len() == before {
            return Err(SnippetError::NotFound(id));
        }
        Ok(())
    }
}

/// One JSON array per user: `<dir>/<user>.json`
#[derive(Debug)]
pub struct FileSnippetStore {
    dir: PathBuf,
    // Serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl FileSnippetStore {
    pub fn open(dir: impl Into<PathBuf>) -> SnippetResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn path_for(&self, user_id: &str) -> SnippetResult<PathBuf> {
        check_user(user_id)?;
        Ok(self.dir.join(format!("{user_id}.json")))
    }

    fn read_user(&self, user_id: &str) -> SnippetResult<Vec<SavedSnippet>> {
        let path = self.path_for(user_id)?;
        match std::fs::read_to_string(&path) {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_user(&self, user_id: &str, snippets: &[SavedSnippet]) -> SnippetResult<()> {
        let path = self.path_for(user_id)?;
        let json = serde_json::to_vec_pretty(snippets)?;
        write_atomic(&path, &json)?;
        Ok(())
    }
}

impl SnippetStore for FileSnippetStore {
    fn list_by_user(&self, user_id: &str) -> SnippetResult<Vec<SavedSnippet>> {
        let mut snippets = self.read_user(user_id)?;
        newest_first(&mut snippets);
        Ok(snippets)
    }

    fn get(&self, user_id: &str, id: Uuid) -> SnippetResult<SavedSnippet> {
        self.read_user(user_id)?
            .into_iter()
            .find(|s| s.id == id)
            .ok_or(SnippetError::NotFound(id))
    }

    fn create(&self, snippet: NewSnippet) -> SnippetResult<SavedSnippet> {
        let saved = snippet.into_saved()?;
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut snippets = self.read_user(&saved.user_id)?;
        snippets.push(saved.clone());
        self.write_user(&saved.user_id, &snippets)?;
        Ok(saved)
    }

    fn delete(&self, user_id: &str, id: Uuid) -> SnippetResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut snippets = self.read_user(user_id)?;
        let before = snippets.len();
        snippets.retain(|s| s.id != id);
        if snippets.len() == before {
            return Err(SnippetError::NotFound(id));
        }
        self.write_user(user_id, &snippets)
    }
}
