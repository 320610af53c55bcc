use crate::autosave::DEFAULT_AUTOSAVE_DEBOUNCE;
use crate::sandbox::SandboxPolicy;
use crate::scheduler::DEFAULT_PREVIEW_DEBOUNCE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_NAME: &str = "livepad.config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    Read {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    Parse {
        config_path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write config file at {config_path}: {source}")]
    Write {
        config_path: PathBuf,
        source: std::io::Error,
    },
}

/// Livepad configuration file format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LivepadConfig {
    /// Interface the preview server binds to
    pub host: String,

    pub port: u16,

    /// Directory holding the saved session and snippets
    pub state_dir: PathBuf,

    /// Quiet period before the preview recomposes
    pub preview_debounce_ms: u64,

    /// Quiet period before the session is written to disk
    pub autosave_debounce_ms: u64,

    /// Owner id for snippets saved from this machine
    pub user_id: String,

    /// Permissions granted to the preview frame
    pub sandbox: SandboxPolicy,
}

impl Default for LivepadConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3030,
            state_dir: PathBuf::from(".livepad"),
            preview_debounce_ms: DEFAULT_PREVIEW_DEBOUNCE.as_millis() as u64,
            autosave_debounce_ms: DEFAULT_AUTOSAVE_DEBOUNCE.as_millis() as u64,
            user_id: "local".to_string(),
            sandbox: SandboxPolicy::default(),
        }
    }
}

impl LivepadConfig {
    /// Load `livepad.config.json` from a directory, defaults if absent
    pub fn load(cwd: &Path) -> Result<Self, ConfigError> {
        Self::load_from_path(&cwd.join(DEFAULT_CONFIG_NAME))
    }

    pub fn load_from_path(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
            config_path: config_path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            config_path: config_path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, cwd: &Path) -> Result<PathBuf, ConfigError> {
        let config_path = cwd.join(DEFAULT_CONFIG_NAME);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, json).map_err(|source| ConfigError::Write {
            config_path: config_path.clone(),
            source,
        })?;
        Ok(config_path)
    }

    /// State directory resolved against the working directory
    pub fn state_dir(&self, cwd: &Path) -> PathBuf {
        cwd.join(&self.state_dir)
    }

    pub fn preview_debounce(&self) -> Duration {
        Duration::from_millis(self.preview_debounce_ms)
    }

    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "port": 4000,
            "stateDir": "/tmp/livepad",
            "previewDebounceMs": 150,
            "userId": "alice",
            "sandbox": { "allowModals": true }
        }"#;

        let config: LivepadConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.port, 4000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.state_dir, PathBuf::from("/tmp/livepad"));
        assert_eq!(config.preview_debounce(), Duration::from_millis(150));
        assert_eq!(config.autosave_debounce(), Duration::from_millis(1000));
        assert_eq!(config.user_id, "alice");
        assert!(config.sandbox.allow_scripts);
        assert!(config.sandbox.allow_modals);
    }

    #[test]
    fn test_default_config() {
        let config = LivepadConfig::default();
        assert_eq!(config.address(), "127.0.0.1:3030");
        assert_eq!(config.preview_debounce(), Duration::from_millis(300));
        assert_eq!(config.sandbox, SandboxPolicy::scripts_only());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(LivepadConfig::load(dir.path()).unwrap(), LivepadConfig::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let config = LivepadConfig {
            port: 8080,
            ..Default::default()
        };
        config.save(dir.path()).unwrap();
        assert_eq!(LivepadConfig::load(dir.path()).unwrap(), config);
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), "{ port: }").unwrap();

        let err = LivepadConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(DEFAULT_CONFIG_NAME));
    }
}
