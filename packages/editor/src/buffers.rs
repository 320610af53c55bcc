//! # Source Buffers
//!
//! Holds the three editor buffers (markup, styles, script) and the library
//! toggles of one editing session.
//!
//! Every mutating call notifies all observers synchronously, exactly once,
//! whether or not the content changed. Observers run while the caller still
//! holds the store, so they must not call back into it; the usual observer
//! only flags that a recompose is due.

use crate::EditorError;
use livepad_composer::{LibraryRegistry, LibraryToggleSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Which of the three buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BufferKind {
    Markup,
    Styles,
    Script,
}

impl BufferKind {
    pub const ALL: [BufferKind; 3] = [BufferKind::Markup, BufferKind::Styles, BufferKind::Script];

    /// Editor language tag
    pub fn language(self) -> &'static str {
        match self {
            BufferKind::Markup => "html",
            BufferKind::Styles => "css",
            BufferKind::Script => "javascript",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BufferKind::Markup => "markup",
            BufferKind::Styles => "styles",
            BufferKind::Script => "script",
        }
    }
}

impl fmt::Display for BufferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BufferKind {
    type Err = EditorError;

    /// Accepts buffer names and language names (`html`, `css`, `js`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "markup" | "html" => Ok(BufferKind::Markup),
            "styles" | "css" => Ok(BufferKind::Styles),
            "script" | "js" | "javascript" => Ok(BufferKind::Script),
            other => Err(EditorError::UnknownBuffer(other.to_string())),
        }
    }
}

/// Immutable snapshot of all three buffers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceBuffers {
    pub markup: String,
    pub styles: String,
    pub script: String,
}

impl SourceBuffers {
    pub fn new(
        markup: impl Into<String>,
        styles: impl Into<String>,
        script: impl Into<String>,
    ) -> Self {
        Self {
            markup: markup.into(),
            styles: styles.into(),
            script: script.into(),
        }
    }

    pub fn get(&self, kind: BufferKind) -> &str {
        match kind {
            BufferKind::Markup => &self.markup,
            BufferKind::Styles => &self.styles,
            BufferKind::Script => &self.script,
        }
    }

    fn get_mut(&mut self, kind: BufferKind) -> &mut String {
        match kind {
            BufferKind::Markup => &mut self.markup,
            BufferKind::Styles => &mut self.styles,
            BufferKind::Script => &mut self.script,
        }
    }
}

/// What a mutation touched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferChange {
    Buffer(BufferKind),
    AllBuffers,
    Library { name: String, enabled: bool },
    AllLibraries,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn Fn(&BufferChange) + Send + Sync>;

pub struct SourceBufferStore {
    registry: Arc<LibraryRegistry>,
    buffers: Arc<SourceBuffers>,
    libraries: LibraryToggleSet,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl SourceBufferStore {
    /// Empty buffers, every library disabled
    pub fn new(registry: Arc<LibraryRegistry>) -> Self {
        let libraries = LibraryToggleSet::for_registry(&registry);
        Self {
            registry,
            buffers: Arc::new(SourceBuffers::default()),
            libraries,
            observers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn registry(&self) -> &Arc<LibraryRegistry> {
        &self.registry
    }

    /// Replace one buffer's content
    pub fn set_buffer(&mut self, kind: BufferKind, text: impl Into<String>) {
        *Arc::make_mut(&mut self.buffers).get_mut(kind) = text.into();
        self.notify(&BufferChange::Buffer(kind));
    }

    /// Replace all three buffers; observers only ever see the new triple
    pub fn replace_all(
        &mut self,
        markup: impl Into<String>,
        styles: impl Into<String>,
        script: impl Into<String>,
    ) {
        self.buffers = Arc::new(SourceBuffers::new(markup, styles, script));
        self.notify(&BufferChange::AllBuffers);
    }

    pub fn snapshot(&self) -> Arc<SourceBuffers> {
        Arc::clone(&self.buffers)
    }

    pub fn buffer(&self, kind: BufferKind) -> &str {
        self.buffers.get(kind)
    }

    pub fn libraries(&self) -> &LibraryToggleSet {
        &self.libraries
    }

    /// Toggle one catalog library
    pub fn set_library(&mut self, name: &str, enabled: bool) -> Result<(), EditorError> {
        self.libraries.set(&self.registry, name, enabled)?;
        self.notify(&BufferChange::Library {
            name: name.to_string(),
            enabled,
        });
        Ok(())
    }

    /// Replace the whole toggle set, reconciled against the catalog
    pub fn replace_libraries(&mut self, mut libraries: LibraryToggleSet) {
        for name in libraries.reconcile(&self.registry) {
            tracing::warn!(library = %name, "ignoring unknown library toggle");
        }
        self.libraries = libraries;
        self.notify(&BufferChange::AllLibraries);
    }

    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: Fn(&BufferChange) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    fn notify(&self, change: &BufferChange) {
        tracing::trace!(?change, observers = self.observers.len(), "buffer store changed");
        for (_, observer) in &self.observers {
            observer(change);
        }
    }
}

impl fmt::Debug for SourceBufferStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceBufferStore")
            .field("buffers", &self.buffers)
            .field("libraries", &self.libraries)
            .field("observers", &self.observers.len())
            .finish()
    }
}
