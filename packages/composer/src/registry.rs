//! # Library Registry
//!
//! Static catalog of front-end libraries that can be injected into the
//! preview document. Each entry maps a display name (e.g. `"jQuery"`) to the
//! literal `<link>`/`<script>` fragments referencing its CDN assets.
//!
//! Declaration order is significant: composed documents always inject
//! fragments in catalog order, never in the order toggles were flipped.

use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Unknown library: {0}")]
    UnknownLibrary(String),

    #[error("Library declared twice: {0}")]
    DuplicateLibrary(String),
}

/// A single catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryEntry {
    pub name: String,
    pub fragments: Vec<String>,
}

impl LibraryEntry {
    pub fn new(name: impl Into<String>, fragments: Vec<String>) -> Self {
        Self {
            name: name.into(),
            fragments,
        }
    }

    fn builtin(name: &str, fragments: &[&str]) -> Self {
        Self::new(name, fragments.iter().map(|f| f.to_string()).collect())
    }
}

/// Immutable library catalog. Cheap to share behind an `Arc`.
#[derive(Debug, Clone)]
pub struct LibraryRegistry {
    entries: Vec<LibraryEntry>,
    index: HashMap<String, usize>,
}

impl LibraryRegistry {
    /// Build a registry from entries in declaration order
    pub fn from_entries(entries: Vec<LibraryEntry>) -> Result<Self, RegistryError> {
        let mut index = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            if index.insert(entry.name.clone(), position).is_some() {
                return Err(RegistryError::DuplicateLibrary(entry.name.clone()));
            }
        }
        Ok(Self { entries, index })
    }

    /// The bundled catalog
    pub fn builtin() -> Self {
        let entries = vec![
            LibraryEntry::builtin(
                "Tailwind CSS",
                &[r#"<script src="https://cdn.tailwindcss.com"></script>"#],
            ),
            LibraryEntry::builtin(
                "Bootstrap",
                &[
                    r#"<link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.2/dist/css/bootstrap.min.css">"#,
                    r#"<script src="https://cdn.jsdelivr.net/npm/bootstrap@5.3.2/dist/js/bootstrap.bundle.min.js"></script>"#,
                ],
            ),
            LibraryEntry::builtin(
                "Bulma",
                &[r#"<link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/bulma@0.9.4/css/bulma.min.css">"#],
            ),
            LibraryEntry::builtin(
                "Font Awesome",
                &[r#"<link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.4.2/css/all.min.css">"#],
            ),
            LibraryEntry::builtin(
                "Animate.css",
                &[r#"<link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/animate.css/4.1.1/animate.min.css">"#],
            ),
            LibraryEntry::builtin(
                "jQuery",
                &[r#"<script src="https://code.jquery.com/jquery-3.7.1.min.js"></script>"#],
            ),
            LibraryEntry::builtin(
                "React",
                &[
                    r#"<script src="https://unpkg.com/react@18/umd/react.development.js"></script>"#,
                    r#"<script src="https://unpkg.com/react-dom@18/umd/react-dom.development.js"></script>"#,
                ],
            ),
            LibraryEntry::builtin(
                "Vue",
                &[r#"<script src="https://unpkg.com/vue@3/dist/vue.global.js"></script>"#],
            ),
            LibraryEntry::builtin(
                "Alpine.js",
                &[r#"<script defer src="https://cdn.jsdelivr.net/npm/alpinejs@3.13.3/dist/cdn.min.js"></script>"#],
            ),
            LibraryEntry::builtin(
                "Lodash",
                &[r#"<script src="https://cdn.jsdelivr.net/npm/lodash@4.17.21/lodash.min.js"></script>"#],
            ),
            LibraryEntry::builtin(
                "D3.js",
                &[r#"<script src="https://d3js.org/d3.v7.min.js"></script>"#],
            ),
            LibraryEntry::builtin(
                "Chart.js",
                &[r#"<script src="https://cdn.jsdelivr.net/npm/chart.js@4.4.0/dist/chart.umd.min.js"></script>"#],
            ),
            LibraryEntry::builtin(
                "Three.js",
                &[r#"<script src="https://cdnjs.cloudflare.com/ajax/libs/three.js/r128/three.min.js"></script>"#],
            ),
            LibraryEntry::builtin(
                "GSAP",
                &[r#"<script src="https://cdnjs.cloudflare.com/ajax/libs/gsap/3.12.2/gsap.min.js"></script>"#],
            ),
            LibraryEntry::builtin(
                "Anime.js",
                &[r#"<script src="https://cdnjs.cloudflare.com/ajax/libs/animejs/3.2.1/anime.min.js"></script>"#],
            ),
        ];

        // Names above are unique
        let index = entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (entry.name.clone(), position))
            .collect();
        Self { entries, index }
    }

    /// Injectable fragments for a library, in injection order
    pub fn fragments_for(&self, name: &str) -> Result<&[String], RegistryError> {
        self.index
            .get(name)
            .map(|&position| self.entries[position].fragments.as_slice())
            .ok_or_else(|| RegistryError::UnknownLibrary(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Catalog index of a library
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Library names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub fn entries(&self) -> &[LibraryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LibraryRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
