//! Client configuration and storage locations
//!
//! Preferences live in `<config dir>/taskline/config.json`. The durable storage
//! tier sits next to it; the tab-lifetime tier lives under the runtime directory
//! and is keyed by the terminal session.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use taskline_session::{FileStore, ScopedStorage, SessionConfig, StorageKeys};

/// Configuration file name
const CONFIG_FILE_NAME: &str = "config.json";

/// Configuration directory under ~/.config
const CONFIG_DIR_NAME: &str = "taskline";

/// Durable storage tier file name
const DURABLE_FILE_NAME: &str = "durable.json";

/// Overrides the server URL from the config file
pub const SERVER_URL_ENV: &str = "TASKLINE_SERVER_URL";

/// Names the terminal session the tab-lifetime tier belongs to
pub const TAB_SCOPE_ENV: &str = "TASKLINE_TAB";

/// Client configuration that persists across sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Taskline server base URL
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Log file; defaults to `taskline.log` in the config directory
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Use the high-contrast palette
    #[serde(default)]
    pub high_contrast: bool,

    /// Storage keys and auto-lock tunables
    #[serde(default)]
    pub session: SessionConfig,
}

fn default_server_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_request_timeout() -> u64 {
    15
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            request_timeout_secs: default_request_timeout(),
            log_file: None,
            high_contrast: false,
            session: SessionConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Get the configuration directory path
    pub fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return Some(PathBuf::from(xdg_config).join(CONFIG_DIR_NAME));
        }
        dirs::config_dir().map(|p| p.join(CONFIG_DIR_NAME))
    }

    /// Get the full config file path
    pub fn config_file_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from `path`, or the default location
    ///
    /// Returns the default configuration if the file doesn't exist or can't be
    /// parsed. The server URL environment override is applied afterwards.
    pub fn load(path: Option<&Path>) -> Self {
        let path = match path.map(Path::to_path_buf).or_else(Self::config_file_path) {
            Some(p) => p,
            None => return Self::default().with_env_overrides(),
        };

        Self::load_file(&path).with_env_overrides()
    }

    fn load_file(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file: {}", e);
                Self::default()
            }),
            Err(e) => {
                tracing::warn!("Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(SERVER_URL_ENV) {
            if !url.trim().is_empty() {
                self.server_url = url;
            }
        }
        self
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_dir = Self::config_dir().ok_or(ConfigError::NoConfigDir)?;
        let config_file = config_dir.join(CONFIG_FILE_NAME);

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        fs::write(&config_file, contents).map_err(|e| ConfigError::Io(e.to_string()))?;

        tracing::debug!("Saved config to {:?}", config_file);
        Ok(())
    }

    /// Request timeout as a duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Log file location
    pub fn log_path(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(|| {
            Self::config_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("taskline.log")
        })
    }
}

/// Files backing the two storage tiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    pub durable: PathBuf,
    pub tab: PathBuf,
}

impl StoragePaths {
    /// Locations for the current user and terminal session
    pub fn resolve() -> Result<Self, ConfigError> {
        let config_dir = ClientConfig::config_dir().ok_or(ConfigError::NoConfigDir)?;
        let runtime_dir = dirs::runtime_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(CONFIG_DIR_NAME);
        Ok(Self::under(&config_dir, &runtime_dir, &tab_scope()))
    }

    /// Locations under explicit directories
    pub fn under(config_dir: &Path, runtime_dir: &Path, scope: &str) -> Self {
        Self {
            durable: config_dir.join(DURABLE_FILE_NAME),
            tab: runtime_dir.join(format!("tab-{}.json", scope)),
        }
    }

    /// Open both tiers
    pub fn open(&self, keys: StorageKeys) -> ScopedStorage {
        ScopedStorage::new(
            Arc::new(FileStore::new(&self.durable)),
            Arc::new(FileStore::new(&self.tab)),
            keys,
        )
    }
}

/// Identifier of the current terminal session
///
/// `TASKLINE_TAB` when set, otherwise the parent (shell) process id so every
/// shell gets its own tab tier.
pub fn tab_scope() -> String {
    if let Ok(scope) = std::env::var(TAB_SCOPE_ENV) {
        let scope = sanitize_scope(&scope);
        if !scope.is_empty() {
            return scope;
        }
    }

    #[cfg(unix)]
    {
        std::os::unix::process::parent_id().to_string()
    }

    #[cfg(not(unix))]
    {
        std::process::id().to_string()
    }
}

/// Keep only characters safe in a file name
pub fn sanitize_scope(scope: &str) -> String {
    scope
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .take(64)
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialize(String),
}
