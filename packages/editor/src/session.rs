//! # Edit Session
//!
//! Everything one user's editing session owns: buffers and library toggles,
//! settings, pane layout and the name of the snippet being edited.
//!
//! [`SessionSnapshot`] is the persisted form. Layout geometry is transient;
//! only the arrangement preference travels with the settings.

use crate::buffers::{SourceBufferStore, SourceBuffers};
use crate::layout::{LayoutManager, LayoutMode};
use crate::settings::EditorSettings;
use crate::EditorError;
use livepad_composer::{LibraryRegistry, LibraryToggleSet};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Serialized `{buffers, settings, libraryToggles, currentName}` blob
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSnapshot {
    pub buffers: SourceBuffers,
    pub settings: EditorSettings,
    pub library_toggles: LibraryToggleSet,
    pub current_name: Option<String>,
}

impl SessionSnapshot {
    pub fn to_json(&self) -> Result<String, EditorError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, EditorError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug)]
pub struct EditSession {
    store: SourceBufferStore,
    settings: EditorSettings,
    layout: LayoutManager,
    current_name: Option<String>,
}

impl EditSession {
    /// Fresh session: empty buffers, default settings
    pub fn new(registry: Arc<LibraryRegistry>) -> Self {
        let settings = EditorSettings::default();
        Self {
            store: SourceBufferStore::new(registry),
            layout: LayoutManager::new(settings.layout),
            settings,
            current_name: None,
        }
    }

    /// Session rebuilt from a persisted snapshot
    pub fn from_snapshot(registry: Arc<LibraryRegistry>, snapshot: SessionSnapshot) -> Self {
        let mut session = Self::new(registry);
        session.restore(snapshot);
        session
    }

    pub fn store(&self) -> &SourceBufferStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SourceBufferStore {
        &mut self.store
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    /// Apply settings from the settings panel. The layout preference only
    /// changes while on desktop; on mobile the stored one is kept.
    pub fn update_settings(&mut self, settings: EditorSettings) -> &EditorSettings {
        let mut settings = settings.sanitized();
        if !self.layout.set_mode(settings.layout) {
            settings.layout = self.layout.mode();
        }
        self.settings = settings;
        &self.settings
    }

    pub fn layout(&self) -> &LayoutManager {
        &self.layout
    }

    pub fn layout_mut(&mut self) -> &mut LayoutManager {
        &mut self.layout
    }

    /// Cycle the arrangement and keep the settings in step
    pub fn toggle_layout(&mut self) -> LayoutMode {
        if self.layout.toggle_layout() {
            self.settings.layout = self.layout.mode();
        }
        self.layout.mode()
    }

    pub fn current_name(&self) -> Option<&str> {
        self.current_name.as_deref()
    }

    pub fn set_current_name(&mut self, name: Option<String>) {
        self.current_name = name;
    }

    /// Swap in a saved snippet's sources in one atomic replace
    pub fn load_snippet(&mut self, name: impl Into<String>, buffers: SourceBuffers) {
        let SourceBuffers {
            markup,
            styles,
            script,
        } = buffers;
        self.current_name = Some(name.into());
        self.store.replace_all(markup, styles, script);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            buffers: (*self.store.snapshot()).clone(),
            settings: self.settings.clone(),
            library_toggles: self.store.libraries().clone(),
            current_name: self.current_name.clone(),
        }
    }

    /// Replace session state with a snapshot
    pub fn restore(&mut self, snapshot: SessionSnapshot) {
        let SessionSnapshot {
            buffers,
            settings,
            library_toggles,
            current_name,
        } = snapshot;

        self.settings = settings.sanitized();
        self.layout.restore_preference(self.settings.layout);
        self.current_name = current_name;
        self.store.replace_libraries(library_toggles);
        self.store
            .replace_all(buffers.markup, buffers.styles, buffers.script);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffers::BufferKind;

    fn session() -> EditSession {
        EditSession::new(Arc::new(LibraryRegistry::builtin()))
    }

    #[test]
    fn test_session_creation() {
        let session = session();
        assert_eq!(session.current_name(), None);
        assert_eq!(*session.settings(), EditorSettings::default());
        assert_eq!(session.snapshot().buffers, SourceBuffers::default());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut session = session();
        session.store_mut().set_buffer(BufferKind::Markup, "<h1>Hi</h1>");
        session.store_mut().set_buffer(BufferKind::Styles, "h1{color:red}");
        session.store_mut().set_library("D3.js", true).unwrap();
        session.set_current_name(Some("demo".to_string()));
        session.update_settings(EditorSettings {
            font_size: 16,
            layout: LayoutMode::Stacked,
            ..Default::default()
        });

        let json = session.snapshot().to_json().unwrap();
        let restored = EditSession::from_snapshot(
            Arc::new(LibraryRegistry::builtin()),
            SessionSnapshot::from_json(&json).unwrap(),
        );

        assert_eq!(restored.snapshot(), session.snapshot());
        assert_eq!(restored.layout().mode(), LayoutMode::Stacked);
    }

    #[test]
    fn test_snapshot_uses_camel_case_keys() {
        let json = session().snapshot().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert!(value.get("libraryToggles").is_some());
        assert!(value.get("currentName").is_some());
        assert!(value["buffers"].get("markup").is_some());
    }

    #[test]
    fn test_partial_snapshot_fills_defaults() {
        let snapshot = SessionSnapshot::from_json(r#"{ "buffers": { "script": "go()" } }"#).unwrap();
        let session = EditSession::from_snapshot(Arc::new(LibraryRegistry::builtin()), snapshot);

        assert_eq!(session.store().buffer(BufferKind::Script), "go()");
        assert_eq!(session.store().buffer(BufferKind::Markup), "");
        assert_eq!(*session.settings(), EditorSettings::default());
        assert_eq!(
            session.store().libraries().len(),
            LibraryRegistry::builtin().len()
        );
    }

    #[test]
    fn test_oversized_font_keeps_rest_of_snapshot() {
        let snapshot = SessionSnapshot::from_json(
            r#"{ "buffers": { "markup": "<p>precious</p>" }, "settings": { "fontSize": 300 }, "currentName": "keep" }"#,
        )
        .unwrap();
        let session = EditSession::from_snapshot(Arc::new(LibraryRegistry::builtin()), snapshot);

        assert_eq!(session.store().buffer(BufferKind::Markup), "<p>precious</p>");
        assert_eq!(session.current_name(), Some("keep"));
        assert_eq!(session.settings().font_size, 24);
    }

    #[test]
    fn test_load_snippet_replaces_buffers() {
        let mut session = session();
        session.store_mut().set_buffer(BufferKind::Script, "old()");

        session.load_snippet("card", SourceBuffers::new("<div></div>", "div{}", ""));

        assert_eq!(session.current_name(), Some("card"));
        assert_eq!(
            *session.store().snapshot(),
            SourceBuffers::new("<div></div>", "div{}", "")
        );
    }

    #[test]
    fn test_toggle_layout_updates_settings() {
        let mut session = session();
        assert_eq!(session.toggle_layout(), LayoutMode::Vertical);
        assert_eq!(session.settings().layout, LayoutMode::Vertical);
    }

    #[test]
    fn test_settings_layout_kept_on_mobile() {
        let mut session = session();
        session.toggle_layout();
        session.layout_mut().on_viewport_resize(400.0);

        let applied = session.update_settings(EditorSettings {
            layout: LayoutMode::Stacked,
            ..Default::default()
        });

        assert_eq!(applied.layout, LayoutMode::Vertical);
        assert_eq!(session.layout().mode(), LayoutMode::Vertical);
    }
}
