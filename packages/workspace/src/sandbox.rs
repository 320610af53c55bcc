//! # Sandboxed Rendering
//!
//! The preview document runs inside an `<iframe sandbox>` (or, when fetched
//! directly, under an equivalent `Content-Security-Policy: sandbox` header).
//! The default policy lets the document run scripts and nothing else: no
//! same-origin storage or cookies, no form submission, no popups, no
//! top-level navigation.

use crate::scheduler::PublishedPreview;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Sandbox permissions granted to the preview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SandboxPolicy {
    pub allow_scripts: bool,
    pub allow_forms: bool,
    pub allow_modals: bool,
    pub allow_popups: bool,
    pub allow_same_origin: bool,
    pub allow_top_navigation: bool,
}

impl SandboxPolicy {
    /// Scripts only
    pub const fn scripts_only() -> Self {
        Self {
            allow_scripts: true,
            allow_forms: false,
            allow_modals: false,
            allow_popups: false,
            allow_same_origin: false,
            allow_top_navigation: false,
        }
    }

    /// Value of the iframe `sandbox` attribute
    pub fn to_attribute(&self) -> String {
        let flags = [
            (self.allow_scripts, "allow-scripts"),
            (self.allow_forms, "allow-forms"),
            (self.allow_modals, "allow-modals"),
            (self.allow_popups, "allow-popups"),
            (self.allow_same_origin, "allow-same-origin"),
            (self.allow_top_navigation, "allow-top-navigation"),
        ];
        flags
            .iter()
            .filter(|(enabled, _)| *enabled)
            .map(|(_, token)| *token)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Value of a `Content-Security-Policy` header applying the same sandbox
    pub fn csp_header(&self) -> String {
        let attribute = self.to_attribute();
        if attribute.is_empty() {
            "sandbox".to_string()
        } else {
            format!("sandbox {attribute}")
        }
    }
}

impl Default for SandboxPolicy {
    fn default() -> Self {
        Self::scripts_only()
    }
}

/// Displays preview documents. Each call fully replaces what was shown.
pub trait SandboxRenderer: Send + Sync {
    fn render(&self, preview: &Arc<PublishedPreview>);
}

/// Fans documents out to every connected preview host
pub struct BroadcastRenderer {
    tx: broadcast::Sender<Arc<PublishedPreview>>,
}

impl BroadcastRenderer {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<PublishedPreview>> {
        self.tx.subscribe()
    }

    pub fn host_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastRenderer {
    fn default() -> Self {
        Self::new(16)
    }
}

impl SandboxRenderer for BroadcastRenderer {
    fn render(&self, preview: &Arc<PublishedPreview>) {
        // No hosts connected is not an error
        let hosts = self.tx.send(preview.clone()).unwrap_or(0);
        tracing::debug!(generation = preview.generation, hosts, "rendered preview");
    }
}

/// Keeps every rendered document, in order
#[derive(Default)]
pub struct RecordingRenderer {
    rendered: Mutex<Vec<Arc<PublishedPreview>>>,
}

impl RecordingRenderer {
    pub fn documents(&self) -> Vec<String> {
        self.rendered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|preview| preview.document.as_str().to_string())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.rendered.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn last(&self) -> Option<Arc<PublishedPreview>> {
        self.rendered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }
}

impl SandboxRenderer for RecordingRenderer {
    fn render(&self, preview: &Arc<PublishedPreview>) {
        self.rendered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(preview.clone());
    }
}

const HOST_PAGE: &str = include_str!("../assets/index.html");

/// Playground page embedding the preview frame under `policy`
pub fn host_page(policy: &SandboxPolicy) -> String {
    HOST_PAGE.replace("{{SANDBOX}}", &policy.to_attribute())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_scripts_only() {
        let policy = SandboxPolicy::default();
        assert_eq!(policy.to_attribute(), "allow-scripts");
        assert_eq!(policy.csp_header(), "sandbox allow-scripts");
    }

    #[test]
    fn test_fully_locked_policy() {
        let policy = SandboxPolicy {
            allow_scripts: false,
            ..SandboxPolicy::scripts_only()
        };
        assert_eq!(policy.to_attribute(), "");
        assert_eq!(policy.csp_header(), "sandbox");
    }

    #[test]
    fn test_policy_from_config_json() {
        let policy: SandboxPolicy = serde_json::from_str(r#"{ "allowModals": true }"#).unwrap();
        assert_eq!(policy.to_attribute(), "allow-scripts allow-modals");
    }

    #[test]
    fn test_host_page_carries_sandbox() {
        let page = host_page(&SandboxPolicy::default());
        assert!(page.contains(r#"sandbox="allow-scripts""#));
        assert!(!page.contains("{{SANDBOX}}"));
        assert!(!page.contains("allow-same-origin"));
    }
}
