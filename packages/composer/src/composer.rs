use crate::registry::LibraryRegistry;
use crate::toggles::LibraryToggleSet;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// A fully assembled preview document.
///
/// Never mutated once built; a new edit produces a new document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ComposedDocument(String);

impl ComposedDocument {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// CRC32 of the document bytes. Served as the preview `ETag`; renders
    /// never consult it.
    pub fn content_hash(&self) -> u32 {
        crc32fast::hash(self.0.as_bytes())
    }
}

impl fmt::Display for ComposedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ComposedDocument {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

struct Context {
    buffer: String,
}

impl Context {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: String::with_capacity(capacity),
        }
    }

    fn add(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    fn add_element(&mut self, tag: &str, body: &str) {
        self.add("<");
        self.add(tag);
        self.add(">");
        self.add(body);
        self.add("</");
        self.add(tag);
        self.add(">");
    }

    fn get_output(self) -> ComposedDocument {
        ComposedDocument(self.buffer)
    }
}

/// Builds preview documents against an injected library catalog
#[derive(Debug, Clone)]
pub struct DocumentComposer {
    registry: Arc<LibraryRegistry>,
}

impl DocumentComposer {
    pub fn new(registry: Arc<LibraryRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &LibraryRegistry {
        &self.registry
    }

    /// Assemble one HTML document from the three sources and enabled
    /// libraries.
    ///
    /// Sources are embedded literally. Library fragments follow catalog
    /// order. Enabled names missing from the catalog are skipped.
    pub fn compose(
        &self,
        markup: &str,
        styles: &str,
        script: &str,
        toggles: &LibraryToggleSet,
    ) -> ComposedDocument {
        let fragments = self.head_fragments(toggles);
        let fragments_len: usize = fragments.iter().map(|f| f.len()).sum();

        let mut ctx =
            Context::with_capacity(markup.len() + styles.len() + script.len() + fragments_len + 96);

        ctx.add("<html><head>");
        ctx.add_element("style", styles);
        for fragment in fragments {
            ctx.add(fragment);
        }
        ctx.add("</head><body>");
        ctx.add(markup);
        ctx.add_element("script", script);
        ctx.add("</body></html>");

        let document = ctx.get_output();
        tracing::debug!(
            bytes = document.len(),
            hash = document.content_hash(),
            "composed preview document"
        );
        document
    }

    fn head_fragments<'a>(&'a self, toggles: &LibraryToggleSet) -> Vec<&'a str> {
        for name in toggles.enabled() {
            if !self.registry.contains(name) {
                tracing::warn!(library = name, "dropping unknown library from preview");
            }
        }

        let mut fragments = Vec::new();
        for name in self.registry.names() {
            if !toggles.is_enabled(name) {
                continue;
            }
            match self.registry.fragments_for(name) {
                Ok(entry) => fragments.extend(entry.iter().map(String::as_str)),
                Err(err) => tracing::warn!(error = %err, "skipping library"),
            }
        }
        fragments
    }
}

impl Default for DocumentComposer {
    fn default() -> Self {
        Self::new(Arc::new(LibraryRegistry::builtin()))
    }
}
