//! Error types for the session core

use thiserror::Error;

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors surfaced by [`SessionManager`](crate::SessionManager) operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// An operation that needs a signed-in user was called without one
    #[error("No user session")]
    NoSession,

    /// The remote collaborator refused the request (or could not be reached)
    #[error("{0}")]
    Rejected(String),

    /// A newer transition replaced the identity this request started under
    #[error("Session changed while the request was in flight")]
    Superseded,

    /// Storage tier failure
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors raised by a key-value storage tier
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// The backing file could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Another writer panicked while holding the store
    #[error("Store lock poisoned")]
    Poisoned,
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

/// Failure reported by a remote collaborator
///
/// Transport failures and application-level rejections travel through the same
/// type; only the message differs.
#[derive(Debug, Error, Clone, PartialEq, Eq, Default)]
#[error("{}", self.message.as_deref().unwrap_or("Request failed"))]
pub struct BackendError {
    /// Human-readable reason, if the collaborator supplied one
    pub message: Option<String>,
}

impl BackendError {
    /// A failure carrying the collaborator's message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    /// A failure with no usable message
    pub fn unspecified() -> Self {
        Self { message: None }
    }

    /// The collaborator's message, or `fallback` when none was given
    pub fn message_or(&self, fallback: &str) -> String {
        match self.message.as_deref() {
            Some(message) if !message.trim().is_empty() => message.to_string(),
            _ => fallback.to_string(),
        }
    }
}
