//! # Workspace
//!
//! One playground session with everything wired around it: the preview
//! scheduler and renderer, autosave, the snippet store and user notices.
//!
//! ```text
//!   edits ──► SourceBufferStore ──observers──┬──► PreviewScheduler ──► BroadcastRenderer
//!                                            └──► Autosaver ──► KeyValueStore
//! ```

use crate::autosave::Autosaver;
use crate::config::LivepadConfig;
use crate::notice::Notifier;
use crate::persistence::{FileStore, KeyValueStore, LocalPersistence, PersistenceError};
use crate::sandbox::{BroadcastRenderer, SandboxPolicy};
use crate::scheduler::{PreviewScheduler, PublishedPreview};
use crate::snippets::{FileSnippetStore, NewSnippet, SavedSnippet, SnippetError, SnippetResult, SnippetStore};
use crate::SharedSession;
use livepad_composer::{DocumentComposer, LibraryRegistry};
use livepad_editor::{EditSession, EditorSettings, LayoutState};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

/// Snippets live beside the session file
const SNIPPETS_DIR: &str = "snippets";

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Snippet error: {0}")]
    Snippet(#[from] SnippetError),
}

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

pub struct Workspace {
    config: LivepadConfig,
    registry: Arc<LibraryRegistry>,
    session: SharedSession,
    scheduler: PreviewScheduler,
    renderer: Arc<BroadcastRenderer>,
    autosaver: Autosaver,
    snippets: Arc<dyn SnippetStore>,
    notifier: Notifier,
}

impl Workspace {
    /// Workspace backed by files under the configured state directory
    pub fn open(config: LivepadConfig, cwd: &Path) -> WorkspaceResult<Self> {
        let state_dir = config.state_dir(cwd);
        let store = FileStore::open(&state_dir)?;
        let snippets = FileSnippetStore::open(state_dir.join(SNIPPETS_DIR))?;
        tracing::info!(state_dir = %state_dir.display(), "opening workspace");
        Ok(Self::with_stores(config, Arc::new(store), Arc::new(snippets)))
    }

    /// Must be called from within a tokio runtime.
    pub fn with_stores(
        config: LivepadConfig,
        store: Arc<dyn KeyValueStore>,
        snippets: Arc<dyn SnippetStore>,
    ) -> Self {
        let registry = Arc::new(LibraryRegistry::builtin());
        let persistence = LocalPersistence::new(store);
        let session: SharedSession = Arc::new(Mutex::new(EditSession::from_snapshot(
            registry.clone(),
            persistence.restore(),
        )));

        let renderer = Arc::new(BroadcastRenderer::default());
        let scheduler = PreviewScheduler::spawn(
            session.clone(),
            DocumentComposer::new(registry.clone()),
            renderer.clone(),
            config.preview_debounce(),
        );
        let notifier = Notifier::default();
        let autosaver = Autosaver::spawn(
            session.clone(),
            persistence,
            notifier.clone(),
            config.autosave_debounce(),
        );

        {
            let mut session = session.lock().unwrap_or_else(|e| e.into_inner());
            scheduler.attach(session.store_mut());
            autosaver.attach(session.store_mut());
        }

        Self {
            config,
            registry,
            session,
            scheduler,
            renderer,
            autosaver,
            snippets,
            notifier,
        }
    }

    pub fn config(&self) -> &LivepadConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<LibraryRegistry> {
        &self.registry
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    pub fn renderer(&self) -> &Arc<BroadcastRenderer> {
        &self.renderer
    }

    pub fn scheduler(&self) -> &PreviewScheduler {
        &self.scheduler
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn sandbox(&self) -> SandboxPolicy {
        self.config.sandbox
    }

    /// Run `f` with the session locked. Buffer and library mutations made
    /// inside reach the scheduler and autosave through the store observers.
    pub fn with_session<R>(&self, f: impl FnOnce(&mut EditSession) -> R) -> R {
        let mut session = self.session.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut session)
    }

    pub fn current_preview(&self) -> Arc<PublishedPreview> {
        self.scheduler.current()
    }

    pub fn update_settings(&self, settings: EditorSettings) -> EditorSettings {
        let applied = self.with_session(|session| session.update_settings(settings).clone());
        self.autosaver.touch();
        applied
    }

    pub fn toggle_layout(&self) -> LayoutState {
        let state = self.with_session(|session| {
            session.toggle_layout();
            session.layout().state()
        });
        self.autosaver.touch();
        state
    }

    pub fn default_user(&self) -> &str {
        &self.config.user_id
    }

    /// Store the current buffers as a new snippet and make it current
    pub async fn save_snippet(&self, user_id: &str, name: &str) -> SnippetResult<SavedSnippet> {
        let snippet = NewSnippet {
            user_id: user_id.to_string(),
            name: name.to_string(),
            buffers: self.with_session(|session| (*session.store().snapshot()).clone()),
        };

        let store = self.snippets.clone();
        let saved = self.report(blocking(move || store.create(snippet)).await)?;

        self.with_session(|session| session.set_current_name(Some(saved.name.clone())));
        self.autosaver.touch();
        self.notifier.info(format!("Saved \"{}\"", saved.name));
        tracing::info!(id = %saved.id, name = %saved.name, "saved snippet");
        Ok(saved)
    }

    pub async fn list_snippets(&self, user_id: &str) -> SnippetResult<Vec<SavedSnippet>> {
        let store = self.snippets.clone();
        let user_id = user_id.to_string();
        self.report(blocking(move || store.list_by_user(&user_id)).await)
    }

    /// Replace all three buffers with a saved snippet in one step
    pub async fn load_snippet(&self, user_id: &str, id: Uuid) -> SnippetResult<SavedSnippet> {
        let store = self.snippets.clone();
        let user = user_id.to_string();
        let snippet = self.report(blocking(move || store.get(&user, id)).await)?;

        self.with_session(|session| session.load_snippet(snippet.name.clone(), snippet.buffers()));
        tracing::info!(id = %snippet.id, name = %snippet.name, "loaded snippet");
        Ok(snippet)
    }

    pub async fn delete_snippet(&self, user_id: &str, id: Uuid) -> SnippetResult<()> {
        let store = self.snippets.clone();
        let user = user_id.to_string();
        self.report(blocking(move || store.delete(&user, id)).await)?;
        tracing::info!(%id, "deleted snippet");
        Ok(())
    }

    pub async fn save_now(&self) -> Result<(), PersistenceError> {
        self.autosaver.save_now().await
    }

    /// Final save (when auto-save is on) and stop the background tasks
    pub async fn shutdown(self) {
        let auto_save = self.with_session(|session| session.settings().auto_save);
        if auto_save {
            if let Err(e) = self.autosaver.save_now().await {
                tracing::warn!(error = %e, "final save failed");
            }
        }
        self.scheduler.shutdown();
        self.autosaver.shutdown();
    }

    fn report<T>(&self, result: SnippetResult<T>) -> SnippetResult<T> {
        if let Err(e) = &result {
            tracing::warn!(error = %e, "snippet operation failed");
            self.notifier.error(e.to_string());
        }
        result
    }
}

async fn blocking<T, F>(f: F) -> SnippetResult<T>
where
    F: FnOnce() -> SnippetResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| SnippetError::Storage(PersistenceError::Task(e.to_string())))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::NoticeLevel;
    use crate::persistence::MemoryStore;
    use crate::snippets::MemorySnippetStore;
    use livepad_editor::{BufferKind, LayoutMode, SessionSnapshot, SourceBuffers};

    fn workspace_with(store: Arc<dyn KeyValueStore>) -> Workspace {
        Workspace::with_stores(
            LivepadConfig::default(),
            store,
            Arc::new(MemorySnippetStore::new()),
        )
    }

    fn workspace() -> Workspace {
        workspace_with(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_restores_persisted_session() {
        let store = Arc::new(MemoryStore::new());
        let snapshot = SessionSnapshot {
            buffers: SourceBuffers::new("<p>back</p>", "", ""),
            ..Default::default()
        };
        LocalPersistence::new(store.clone()).save(&snapshot).unwrap();

        let ws = workspace_with(store);

        assert!(ws.current_preview().document.as_str().contains("<p>back</p>"));
        ws.shutdown().await;
    }

    #[tokio::test]
    async fn test_snippet_save_and_load() {
        let ws = workspace();
        ws.with_session(|s| s.store_mut().replace_all("<h1>keep</h1>", "h1{}", "k()"));

        let saved = ws.save_snippet("local", "keeper").await.unwrap();
        assert_eq!(ws.with_session(|s| s.current_name().map(String::from)), Some("keeper".into()));

        ws.with_session(|s| s.store_mut().set_buffer(BufferKind::Markup, "<h1>scratch</h1>"));
        ws.load_snippet("local", saved.id).await.unwrap();

        let preview = ws.scheduler().flush();
        assert!(preview.document.as_str().contains("<h1>keep</h1>"));
        assert_eq!(ws.list_snippets("local").await.unwrap().len(), 1);

        ws.delete_snippet("local", saved.id).await.unwrap();
        assert!(ws.list_snippets("local").await.unwrap().is_empty());
        ws.shutdown().await;
    }

    #[tokio::test]
    async fn test_snippet_failure_raises_notice() {
        let ws = workspace();
        let mut notices = ws.notifier().subscribe();

        let result = ws.load_snippet("local", Uuid::new_v4()).await;

        assert!(matches!(result, Err(SnippetError::NotFound(_))));
        let notice = notices.recv().await.unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        ws.shutdown().await;
    }

    #[tokio::test]
    async fn test_toggle_layout_updates_settings() {
        let ws = workspace();
        let state = ws.toggle_layout();
        assert_eq!(state.mode, LayoutMode::Vertical);
        assert_eq!(ws.with_session(|s| s.settings().layout), LayoutMode::Vertical);
        ws.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_saves_session() {
        let store = Arc::new(MemoryStore::new());
        let ws = workspace_with(store.clone());
        ws.with_session(|s| s.store_mut().set_buffer(BufferKind::Script, "last()"));

        ws.shutdown().await;

        let restored = LocalPersistence::new(store).restore();
        assert_eq!(restored.buffers.script, "last()");
    }
}
