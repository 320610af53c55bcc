//! Per-session enabled/disabled state for every catalog library.

use crate::registry::{LibraryRegistry, RegistryError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Library name → enabled flag.
///
/// Sets built with [`LibraryToggleSet::for_registry`] or passed through
/// [`LibraryToggleSet::reconcile`] hold a key for every catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LibraryToggleSet {
    toggles: BTreeMap<String, bool>,
}

impl LibraryToggleSet {
    /// Every catalog library present and disabled
    pub fn for_registry(registry: &LibraryRegistry) -> Self {
        Self {
            toggles: registry.names().map(|name| (name.to_string(), false)).collect(),
        }
    }

    /// Enable or disable a catalog library
    pub fn set(
        &mut self,
        registry: &LibraryRegistry,
        name: &str,
        enabled: bool,
    ) -> Result<(), RegistryError> {
        if !registry.contains(name) {
            return Err(RegistryError::UnknownLibrary(name.to_string()));
        }
        self.toggles.insert(name.to_string(), enabled);
        Ok(())
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.toggles.get(name).copied().unwrap_or(false)
    }

    /// Enabled names in key order (not catalog order)
    pub fn enabled(&self) -> impl Iterator<Item = &str> {
        self.toggles
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.toggles.iter().map(|(name, enabled)| (name.as_str(), *enabled))
    }

    /// Bring a deserialized set in line with the catalog: missing keys are
    /// added disabled, names the catalog does not know are dropped.
    /// Returns the dropped names.
    pub fn reconcile(&mut self, registry: &LibraryRegistry) -> Vec<String> {
        let dropped: Vec<String> = self
            .toggles
            .keys()
            .filter(|name| !registry.contains(name))
            .cloned()
            .collect();
        for name in &dropped {
            self.toggles.remove(name);
        }
        for name in registry.names() {
            self.toggles.entry(name.to_string()).or_insert(false);
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.toggles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toggles.is_empty()
    }
}

impl FromIterator<(String, bool)> for LibraryToggleSet {
    fn from_iter<T: IntoIterator<Item = (String, bool)>>(iter: T) -> Self {
        Self {
            toggles: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_registry_covers_catalog() {
        let registry = LibraryRegistry::builtin();
        let toggles = LibraryToggleSet::for_registry(&registry);
        assert_eq!(toggles.len(), registry.len());
        assert_eq!(toggles.enabled().count(), 0);
    }

    #[test]
    fn test_set_unknown_library() {
        let registry = LibraryRegistry::builtin();
        let mut toggles = LibraryToggleSet::for_registry(&registry);
        let result = toggles.set(&registry, "Backbone", true);
        assert!(matches!(result, Err(RegistryError::UnknownLibrary(_))));
        assert_eq!(toggles.len(), registry.len());
    }

    #[test]
    fn test_reconcile_fills_and_drops() {
        let registry = LibraryRegistry::builtin();
        let mut toggles: LibraryToggleSet = vec![
            ("jQuery".to_string(), true),
            ("Backbone".to_string(), true),
        ]
        .into_iter()
        .collect();

        let dropped = toggles.reconcile(&registry);

        assert_eq!(dropped, vec!["Backbone".to_string()]);
        assert_eq!(toggles.len(), registry.len());
        assert!(toggles.is_enabled("jQuery"));
        assert!(!toggles.is_enabled("React"));
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let registry = LibraryRegistry::builtin();
        let mut toggles = LibraryToggleSet::for_registry(&registry);
        toggles.set(&registry, "Vue", true).unwrap();

        let json = serde_json::to_value(&toggles).unwrap();
        assert_eq!(json["Vue"], serde_json::Value::Bool(true));
        assert_eq!(json["React"], serde_json::Value::Bool(false));
    }
}
