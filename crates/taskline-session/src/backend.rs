//! Remote collaborators consumed by the session core
//!
//! The manager never talks HTTP itself. Everything that crosses the network goes
//! through these traits so the state machine can be driven by a fake in tests and
//! by `taskline-client` in production.

use async_trait::async_trait;
use serde::Serialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::BackendError;
use crate::types::Session;

/// Result type for collaborator calls
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// First-run account provisioning
#[derive(Debug, Clone, Serialize, Zeroize, ZeroizeOnDrop)]
pub struct SetupRequest {
    pub pin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// PIN rotation
#[derive(Debug, Clone, Serialize, Zeroize, ZeroizeOnDrop)]
pub struct ChangePinRequest {
    pub current_pin: String,
    pub new_pin: String,
}

/// Username rename, authorized by the current PIN
#[derive(Debug, Clone, Serialize, Zeroize, ZeroizeOnDrop)]
pub struct ChangeUsernameRequest {
    pub new_username: String,
    pub pin: String,
}

/// Authentication endpoints
///
/// The session credential itself (an HTTP-only cookie) is owned by the
/// implementation and never surfaces here.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Succeeds iff the backend still honors the current credential
    async fn validate_session(&self) -> BackendResult<()>;

    /// Exchange username and PIN for a session
    async fn login(&self, username: &str, pin: &str) -> BackendResult<Session>;

    /// End the remote session
    async fn logout(&self) -> BackendResult<()>;

    /// Provision a new identity
    async fn setup(&self, request: &SetupRequest) -> BackendResult<Session>;

    /// Rotate the PIN
    async fn change_pin(&self, request: &ChangePinRequest) -> BackendResult<()>;

    /// Rename the user; returns the stored username
    async fn change_username(&self, request: &ChangeUsernameRequest) -> BackendResult<String>;
}

/// Source of the auto-lock threshold
#[async_trait]
pub trait SettingsSupplier: Send + Sync {
    /// Minutes of inactivity before auto-lock; `None` or `Some(0)` disables it
    async fn auto_lock_minutes(&self) -> BackendResult<Option<u32>>;
}
