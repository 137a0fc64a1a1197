//! Request and response bodies

use serde::{Deserialize, Serialize};
use taskline_session::Session;
use zeroize::{Zeroize, ZeroizeOnDrop};

#[derive(Debug, Clone, Serialize, Zeroize, ZeroizeOnDrop)]
pub struct LoginRequest {
    pub username: String,
    pub pin: String,
}

/// Body returned by login and setup
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub user: Session,
}

/// Body returned by a username change
#[derive(Debug, Clone, Deserialize)]
pub struct UsernameResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub username: String,
}

/// Per-user settings; only the fields this client reads are kept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UserSettings {
    pub notes_enabled: bool,
    pub timer_enabled: bool,
    /// Minutes of inactivity before auto-lock; 0 disables
    pub auto_lock_minutes: u32,
    pub theme: String,
    pub updated_on: Option<String>,
}

/// Body of `PUT /api/settings/auto-lock`; the route reads `minutes`
#[derive(Debug, Clone, Serialize)]
pub struct AutoLockUpdate {
    pub minutes: u32,
}
