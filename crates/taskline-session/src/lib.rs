//! Taskline Session - authentication, lock, and auto-lock state machine
//!
//! This crate provides:
//! - Two-tier scoped storage for the persisted session record and lock flag
//! - The session manager: restore, login, logout, setup, lock, unlock
//! - Activity monitoring and inactivity-based auto-lock
//! - A supervisor that wires the above to a settings source
//!
//! Remote calls go through the [`AuthBackend`] and [`SettingsSupplier`] traits;
//! `taskline-client` provides the HTTP implementation.

pub mod activity;
pub mod autolock;
pub mod backend;
pub mod config;
pub mod error;
pub mod manager;
pub mod storage;
pub mod supervisor;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use activity::{ActivityMonitor, ActivitySignal, ActivitySource, ListenerGuard};
pub use autolock::AutoLockScheduler;
pub use backend::{
    AuthBackend, BackendResult, ChangePinRequest, ChangeUsernameRequest, SettingsSupplier,
    SetupRequest,
};
pub use config::{SessionConfig, StorageKeys};
pub use error::{BackendError, Result, SessionError, StorageError};
pub use manager::SessionManager;
pub use storage::{FileStore, KeyValueStore, MemoryStore, ScopedStorage, StorageResult, Tier};
pub use supervisor::SessionSupervisor;
pub use types::{PersistedSession, Session, SessionPhase, SessionState};
