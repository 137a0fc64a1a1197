//! Session core configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Storage keys for the persisted records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageKeys {
    /// Session record key
    pub session: String,
    /// Lock flag key
    pub lock: String,
    /// First-run guidance completed marker (durable tier)
    pub tutorial_completed: String,
    /// First-run guidance in progress marker (tab tier)
    pub tutorial_active: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            session: "taskline_auth".to_string(),
            lock: "taskline_lock_state".to_string(),
            tutorial_completed: "taskline_tutorial_completed".to_string(),
            tutorial_active: "taskline_tutorial_active".to_string(),
        }
    }
}

/// Tunables for the manager, scheduler, and supervisor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Persisted record keys
    pub keys: StorageKeys,

    /// How often the auto-lock scheduler samples inactivity (seconds)
    pub check_interval_secs: u64,

    /// How often the auto-lock threshold is re-fetched while signed in (seconds)
    pub settings_refresh_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            keys: StorageKeys::default(),
            check_interval_secs: 60,
            settings_refresh_secs: 5 * 60,
        }
    }
}

impl SessionConfig {
    /// Auto-lock sampling interval
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs.max(1))
    }

    /// Settings re-fetch interval
    pub fn settings_refresh(&self) -> Duration {
        Duration::from_secs(self.settings_refresh_secs.max(1))
    }
}
