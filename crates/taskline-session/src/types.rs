//! Session identity and the published state snapshot

use serde::{Deserialize, Serialize};

/// Identity of the signed-in principal
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Session {
    /// Server-side user id
    pub id: i64,
    /// Display/login name
    pub username: String,
}

impl Session {
    /// Create a new session identity
    pub fn new(id: i64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
        }
    }
}

/// Shape of the persisted session record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    /// The identity to restore
    pub user: Session,
}

impl PersistedSession {
    /// Parse a raw record; `None` for anything that is not a well-formed record
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

/// Coarse state machine position derived from a [`SessionState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Restore sequence still running
    Booting,
    /// No user
    Unauthenticated,
    /// User present, content visible
    Unlocked,
    /// User present, PIN re-entry required
    Locked,
}

/// Read-only snapshot published to UI collaborators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// Signed-in identity, if any
    pub user: Option<Session>,
    /// True only while the boot sequence runs
    pub is_loading: bool,
    /// PIN-gated sub-state; never true without a user
    pub is_locked: bool,
    /// Last operation failure, for display
    pub error: Option<String>,
}

impl SessionState {
    /// State of a freshly constructed manager
    pub fn booting() -> Self {
        Self {
            user: None,
            is_loading: true,
            is_locked: false,
            error: None,
        }
    }

    /// Whether a user is signed in (locked or not)
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Signed in and not locked
    pub fn is_unlocked(&self) -> bool {
        self.user.is_some() && !self.is_locked
    }

    /// Position in the state machine
    pub fn phase(&self) -> SessionPhase {
        match (&self.user, self.is_loading, self.is_locked) {
            (_, true, _) => SessionPhase::Booting,
            (None, false, _) => SessionPhase::Unauthenticated,
            (Some(_), false, false) => SessionPhase::Unlocked,
            (Some(_), false, true) => SessionPhase::Locked,
        }
    }

    /// `isLocked` implies a user is present
    pub fn is_consistent(&self) -> bool {
        !self.is_locked || self.user.is_some()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::booting()
    }
}
