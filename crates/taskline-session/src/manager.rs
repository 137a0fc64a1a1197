//! Session manager: the single owner of session and lock state
//!
//! Every transition goes through [`SessionManager::commit`], which applies the
//! change, writes the matching storage records, checks the lock-implies-user
//! invariant, and publishes the new snapshot. Remote calls never hold the state
//! lock across an await.
//!
//! # Stale results
//!
//! Each change of identity (restore, login, setup, logout, logout rollback) bumps
//! an epoch counter. Asynchronous operations capture the epoch before they
//! suspend and only commit if it is unchanged when they resume, so a login that
//! completes after a logout cannot bring the old session back.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::backend::{AuthBackend, ChangePinRequest, ChangeUsernameRequest, SetupRequest};
use crate::error::{BackendError, Result, SessionError};
use crate::storage::{ScopedStorage, StorageResult};
use crate::types::{PersistedSession, Session, SessionState};

/// Mutable state guarded by the manager lock
struct Inner {
    state: SessionState,
    epoch: u64,
    last_activity: Instant,
}

/// Owner of the authoritative session state
pub struct SessionManager {
    backend: Arc<dyn AuthBackend>,
    storage: ScopedStorage,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<SessionState>,
    booted: AtomicBool,
    unlock_gate: tokio::sync::Mutex<()>,
}

impl SessionManager {
    /// Create a manager in the booting state; call [`restore`](Self::restore) next
    pub fn new(backend: Arc<dyn AuthBackend>, storage: ScopedStorage) -> Self {
        let state = SessionState::booting();
        let (state_tx, _) = watch::channel(state.clone());

        Self {
            backend,
            storage,
            inner: Mutex::new(Inner {
                state,
                epoch: 0,
                last_activity: Instant::now(),
            }),
            state_tx,
            booted: AtomicBool::new(false),
            unlock_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> SessionState {
        self.lock_inner().state.clone()
    }

    /// Receive every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Storage adapter used by this manager
    pub fn storage(&self) -> &ScopedStorage {
        &self.storage
    }

    /// Restore the session from tab storage
    ///
    /// Runs once per manager; later calls return immediately. Never fails: an
    /// unusable record or a rejected validation settles to unauthenticated.
    pub async fn restore(&self) {
        if self.booted.swap(true, Ordering::SeqCst) {
            debug!("Session restore already ran");
            return;
        }

        persist("purge legacy session records", self.storage.purge_legacy());

        let raw = match self.storage.read_session() {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Discarding unreadable session storage: {}", e);
                self.commit(|inner, storage| {
                    clear_records(storage);
                    inner.state.is_loading = false;
                });
                return;
            }
        };

        let Some(raw) = raw else {
            debug!("No stored session");
            self.finish_loading();
            return;
        };

        let Some(record) = PersistedSession::parse(&raw) else {
            warn!("Discarding corrupted session record");
            self.commit(|inner, storage| {
                clear_records(storage);
                inner.state.is_loading = false;
            });
            return;
        };

        let epoch = self.current_epoch();
        let validation = self.backend.validate_session().await;

        self.commit(|inner, storage| {
            let stale = inner.epoch != epoch;
            match validation {
                Ok(()) if !stale => {
                    let locked = matches!(
                        storage.read_lock_flag(),
                        Ok(Some(ref flag)) if flag == "true"
                    );
                    info!(
                        "Restored session for {} ({})",
                        record.user.username,
                        if locked { "locked" } else { "unlocked" }
                    );
                    inner.epoch += 1;
                    inner.state.user = Some(record.user);
                    inner.state.is_locked = locked;
                    inner.last_activity = Instant::now();
                }
                Ok(()) => debug!("Dropping restored session; a newer sign-in committed first"),
                Err(e) => {
                    info!("Stored session is no longer valid: {}", e);
                    if !stale {
                        clear_records(storage);
                    }
                }
            }
            inner.state.is_loading = false;
        });
    }

    /// Sign in with username and PIN
    pub async fn login(&self, username: &str, pin: &str) -> Result<Session> {
        let epoch = self.begin_operation();

        match self.backend.login(username, pin).await {
            Ok(session) => self.commit_identity(epoch, session, false),
            Err(e) => Err(self.fail("Login failed", e)),
        }
    }

    /// Sign out
    ///
    /// The user is cleared before the remote call so dependent work stops at once.
    /// If the remote call fails the previous user (and lock) is put back.
    pub async fn logout(&self) -> Result<()> {
        let (previous, epoch) = self.commit(|inner, storage| {
            let previous = (inner.state.user.take(), inner.state.is_locked);
            inner.state.is_locked = false;
            inner.state.error = None;
            inner.epoch += 1;
            clear_records(storage);
            (previous, inner.epoch)
        });

        match self.backend.logout().await {
            Ok(()) => {
                if let (Some(user), _) = &previous {
                    info!("Signed out {}", user.username);
                }
                Ok(())
            }
            Err(e) => {
                let message = e.message_or("Logout failed");
                warn!("Logout failed, restoring session: {}", message);
                self.commit(|inner, storage| {
                    if let (Some(user), locked) = previous {
                        if inner.epoch == epoch {
                            inner.epoch += 1;
                            persist("write session record", storage.write_session(&user));
                            if locked {
                                persist("write lock flag", storage.write_lock_flag(true));
                            }
                            inner.state.user = Some(user);
                            inner.state.is_locked = locked;
                        }
                    }
                    inner.state.error = Some(message.clone());
                });
                Err(SessionError::Rejected(message))
            }
        }
    }

    /// Provision a new account and sign in as it
    pub async fn setup(&self, pin: &str, username: Option<&str>, email: Option<&str>) -> Result<Session> {
        let epoch = self.begin_operation();
        let request = SetupRequest {
            pin: pin.to_string(),
            username: username.map(str::to_string),
            email: email.map(str::to_string),
        };

        match self.backend.setup(&request).await {
            Ok(session) => self.commit_identity(epoch, session, true),
            Err(e) => Err(self.fail("Setup failed", e)),
        }
    }

    /// Rotate the PIN; no effect on session or lock state
    pub async fn change_pin(&self, current_pin: &str, new_pin: &str) -> Result<()> {
        self.begin_operation();
        let request = ChangePinRequest {
            current_pin: current_pin.to_string(),
            new_pin: new_pin.to_string(),
        };

        match self.backend.change_pin(&request).await {
            Ok(()) => {
                info!("PIN changed");
                Ok(())
            }
            Err(e) => Err(self.fail("PIN change failed", e)),
        }
    }

    /// Rename the signed-in user
    pub async fn change_username(&self, new_username: &str, pin: &str) -> Result<String> {
        let epoch = self.begin_operation();
        let request = ChangeUsernameRequest {
            new_username: new_username.to_string(),
            pin: pin.to_string(),
        };

        match self.backend.change_username(&request).await {
            Ok(username) => {
                self.commit(|inner, storage| {
                    if inner.epoch != epoch {
                        debug!("Username changed remotely after the session moved on");
                        return;
                    }
                    if let Some(user) = inner.state.user.as_mut() {
                        info!("Username changed from {} to {}", user.username, username);
                        user.username = username.clone();
                        persist("write session record", storage.write_session(user));
                    }
                });
                Ok(username)
            }
            Err(e) => Err(self.fail("Username change failed", e)),
        }
    }

    /// Engage the lock
    ///
    /// Without a session there is nothing to lock and the call does nothing.
    pub fn lock(&self) {
        self.commit(|inner, storage| {
            if inner.state.user.is_none() {
                debug!("Ignoring lock request without a session");
                return;
            }
            engage_lock(inner, storage);
        });
    }

    /// Lock if the session has been idle for at least `threshold`
    ///
    /// Returns whether this call engaged the lock.
    pub fn lock_if_idle(&self, threshold: Duration) -> bool {
        self.commit(|inner, storage| {
            if !inner.state.is_unlocked() {
                return false;
            }
            let idle = inner.last_activity.elapsed();
            if idle < threshold {
                return false;
            }
            info!("Auto-locking after {}s of inactivity", idle.as_secs());
            engage_lock(inner, storage);
            true
        })
    }

    /// Re-enter the PIN to release the lock
    ///
    /// Concurrent calls are serialized; a call that finds the lock already
    /// released returns without contacting the backend.
    pub async fn unlock(&self, pin: &str) -> Result<()> {
        let _serial = self.unlock_gate.lock().await;

        let (username, epoch) = {
            let inner = self.lock_inner();
            let Some(user) = inner.state.user.as_ref() else {
                return Err(SessionError::NoSession);
            };
            if !inner.state.is_locked {
                return Ok(());
            }
            (user.username.clone(), inner.epoch)
        };

        self.clear_error();

        match self.backend.login(&username, pin).await {
            Ok(_) => self.commit(|inner, storage| {
                if inner.epoch != epoch {
                    return Err(SessionError::Superseded);
                }
                inner.state.is_locked = false;
                inner.last_activity = Instant::now();
                persist("remove lock flag", storage.remove_lock_flag());
                info!("Session unlocked");
                Ok(())
            }),
            Err(e) => Err(self.fail("Unlock failed", e)),
        }
    }

    /// Record user activity now
    pub fn update_activity(&self) {
        let mut inner = self.lock_inner();
        let now = Instant::now();
        if now > inner.last_activity {
            inner.last_activity = now;
        }
    }

    /// Time since the last recorded activity
    pub fn idle_for(&self) -> Duration {
        self.lock_inner().last_activity.elapsed()
    }

    /// Remaining time before `threshold` of inactivity is reached
    ///
    /// `None` unless a user is signed in and unlocked.
    pub fn time_until_lock(&self, threshold: Duration) -> Option<Duration> {
        let inner = self.lock_inner();
        if !inner.state.is_unlocked() {
            return None;
        }
        Some(threshold.saturating_sub(inner.last_activity.elapsed()))
    }

    /// Dismiss the published error
    pub fn clear_error(&self) {
        self.commit(|inner, _| inner.state.error = None);
    }

    fn lock_inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_epoch(&self) -> u64 {
        self.lock_inner().epoch
    }

    /// Clear the error and capture the epoch for a remote operation
    fn begin_operation(&self) -> u64 {
        self.commit(|inner, _| {
            inner.state.error = None;
            inner.epoch
        })
    }

    fn finish_loading(&self) {
        self.commit(|inner, _| inner.state.is_loading = false);
    }

    /// Apply a transition, then publish the result
    fn commit<R>(&self, apply: impl FnOnce(&mut Inner, &ScopedStorage) -> R) -> R {
        let mut inner = self.lock_inner();
        let result = apply(&mut inner, &self.storage);

        debug_assert!(inner.state.is_consistent(), "locked without a user");

        let state = &inner.state;
        self.state_tx.send_if_modified(|published| {
            if published == state {
                return false;
            }
            *published = state.clone();
            true
        });

        result
    }

    /// Commit a new identity from login or setup
    fn commit_identity(&self, epoch: u64, session: Session, first_run: bool) -> Result<Session> {
        self.commit(|inner, storage| {
            if inner.epoch != epoch {
                debug!("Discarding sign-in for {}; session changed meanwhile", session.username);
                return Err(SessionError::Superseded);
            }

            inner.epoch += 1;
            inner.state.user = Some(session.clone());
            inner.state.is_locked = false;
            inner.state.error = None;
            inner.last_activity = Instant::now();

            persist("write session record", storage.write_session(&session));
            persist("remove lock flag", storage.remove_lock_flag());
            if first_run {
                persist("clear tutorial markers", storage.clear_tutorial_markers());
            }

            info!("Signed in as {}", session.username);
            Ok(session)
        })
    }

    /// Publish a failure and turn it into the caller's error
    fn fail(&self, fallback: &str, error: BackendError) -> SessionError {
        let message = error.message_or(fallback);
        warn!("{}: {}", fallback, message);
        self.commit(|inner, _| inner.state.error = Some(message.clone()));
        SessionError::Rejected(message)
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &self.snapshot())
            .finish_non_exhaustive()
    }
}

fn engage_lock(inner: &mut Inner, storage: &ScopedStorage) {
    if inner.state.is_locked {
        return;
    }
    inner.state.is_locked = true;
    persist("write lock flag", storage.write_lock_flag(true));
    info!("Session locked");
}

fn clear_records(storage: &ScopedStorage) {
    persist("remove session record", storage.remove_session());
    persist("remove lock flag", storage.remove_lock_flag());
}

/// Storage failures never abort a transition; they are logged
fn persist(action: &str, result: StorageResult<()>) {
    if let Err(e) = result {
        warn!("Failed to {}: {}", action, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Tier;
    use crate::testing::FakeBackend;

    const PIN: &str = "123456";

    fn manager_with(backend: Arc<FakeBackend>, storage: ScopedStorage) -> SessionManager {
        SessionManager::new(backend, storage)
    }

    fn backend() -> Arc<FakeBackend> {
        Arc::new(FakeBackend::new().with_account("testuser", PIN))
    }

    async fn signed_in() -> (Arc<FakeBackend>, SessionManager) {
        let backend = backend();
        let manager = manager_with(backend.clone(), ScopedStorage::in_memory());
        manager.restore().await;
        manager.login("testuser", PIN).await.unwrap();
        (backend, manager)
    }

    fn seed_session(storage: &ScopedStorage, user: &Session) {
        storage.write_session(user).unwrap();
    }

    #[tokio::test]
    async fn test_initial_state_is_booting() {
        let manager = manager_with(backend(), ScopedStorage::in_memory());
        let state = manager.snapshot();
        assert!(state.is_loading);
        assert!(state.user.is_none());
        assert!(!state.is_locked);

        manager.restore().await;
        let state = manager.snapshot();
        assert!(!state.is_loading);
        assert!(!state.is_authenticated());
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_restore_success() {
        let backend = backend();
        backend.set_session_valid(true);
        let storage = ScopedStorage::in_memory();
        let user = Session::new(1, "testuser");
        seed_session(&storage, &user);

        let manager = manager_with(backend, storage);
        manager.restore().await;

        let state = manager.snapshot();
        assert_eq!(state.user, Some(user));
        assert!(state.is_authenticated());
        assert!(!state.is_locked);
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_restore_failure_clears_records() {
        let backend = backend();
        backend.set_session_valid(false);
        let storage = ScopedStorage::in_memory();
        seed_session(&storage, &Session::new(1, "testuser"));
        storage.write_lock_flag(true).unwrap();

        let manager = manager_with(backend, storage.clone());
        manager.restore().await;

        let state = manager.snapshot();
        assert!(state.user.is_none());
        assert!(!state.is_locked);
        assert!(state.error.is_none());
        assert_eq!(storage.read_session().unwrap(), None);
        assert_eq!(storage.read_lock_flag().unwrap(), None);
    }

    #[tokio::test]
    async fn test_restore_corrupted_record() {
        let backend = backend();
        backend.set_session_valid(true);
        let storage = ScopedStorage::in_memory();
        let key = storage.keys().session.clone();
        storage.set(Tier::Tab, &key, "{not json").unwrap();
        storage.write_lock_flag(true).unwrap();

        let manager = manager_with(backend.clone(), storage.clone());
        manager.restore().await;

        assert!(manager.snapshot().user.is_none());
        assert!(!manager.snapshot().is_loading);
        assert_eq!(storage.read_session().unwrap(), None);
        assert_eq!(storage.read_lock_flag().unwrap(), None);
        assert_eq!(backend.validate_calls(), 0);
    }

    #[tokio::test]
    async fn test_restore_recovers_from_torn_storage_file() {
        let dir = tempfile::tempdir().unwrap();
        let tab_path = dir.path().join("tab.json");
        std::fs::write(&tab_path, r#"{"taskline_auth": "{\"user\":{\"id"#).unwrap();
        let storage = ScopedStorage::new(
            Arc::new(crate::storage::MemoryStore::new()),
            Arc::new(crate::storage::FileStore::new(&tab_path)),
            crate::config::StorageKeys::default(),
        );

        let backend = backend();
        let manager = manager_with(backend.clone(), storage.clone());
        manager.restore().await;

        assert!(manager.snapshot().user.is_none());
        assert!(!manager.snapshot().is_loading);
        assert_eq!(backend.validate_calls(), 0);
        assert!(!tab_path.exists());

        manager.login("testuser", PIN).await.unwrap();
        manager.lock();
        let raw = storage.read_session().unwrap().unwrap();
        assert_eq!(
            PersistedSession::parse(&raw).map(|record| record.user),
            manager.snapshot().user
        );
        assert_eq!(storage.read_lock_flag().unwrap().as_deref(), Some("true"));
    }

    #[tokio::test]
    async fn test_restore_lock_flag() {
        let backend = backend();
        backend.set_session_valid(true);
        let storage = ScopedStorage::in_memory();
        seed_session(&storage, &Session::new(1, "testuser"));
        storage.write_lock_flag(true).unwrap();

        let manager = manager_with(backend, storage);
        manager.restore().await;

        let state = manager.snapshot();
        assert!(state.is_locked);
        assert!(state.user.is_some());
    }

    #[tokio::test]
    async fn test_restore_lock_flag_must_be_literal_true() {
        let backend = backend();
        backend.set_session_valid(true);
        let storage = ScopedStorage::in_memory();
        seed_session(&storage, &Session::new(1, "testuser"));
        let key = storage.keys().lock.clone();
        storage.set(Tier::Tab, &key, "TRUE").unwrap();

        let manager = manager_with(backend, storage);
        manager.restore().await;

        assert!(!manager.snapshot().is_locked);
    }

    #[tokio::test]
    async fn test_restore_purges_legacy_records() {
        let storage = ScopedStorage::in_memory();
        let keys = storage.keys().clone();
        storage
            .set(Tier::Durable, &keys.session, r#"{"user":{"id":9,"username":"old"}}"#)
            .unwrap();
        storage.set(Tier::Durable, &keys.lock, "true").unwrap();

        let manager = manager_with(backend(), storage.clone());
        manager.restore().await;

        assert!(manager.snapshot().user.is_none());
        assert_eq!(storage.get(Tier::Durable, &keys.session).unwrap(), None);
        assert_eq!(storage.get(Tier::Durable, &keys.lock).unwrap(), None);
    }

    #[tokio::test]
    async fn test_restore_runs_once() {
        let backend = backend();
        backend.set_session_valid(true);
        let storage = ScopedStorage::in_memory();
        seed_session(&storage, &Session::new(1, "testuser"));

        let manager = manager_with(backend.clone(), storage);
        manager.restore().await;
        manager.restore().await;

        assert_eq!(backend.validate_calls(), 1);
    }

    #[tokio::test]
    async fn test_login_success() {
        let (_, manager) = signed_in().await;
        let state = manager.snapshot();

        assert_eq!(state.user, Some(Session::new(1, "testuser")));
        assert!(state.is_authenticated());
        assert!(!state.is_locked);
        assert!(state.error.is_none());

        let raw = manager.storage().read_session().unwrap().unwrap();
        assert_eq!(
            PersistedSession::parse(&raw).unwrap().user,
            Session::new(1, "testuser")
        );
    }

    #[tokio::test]
    async fn test_login_failure_publishes_error() {
        let manager = manager_with(backend(), ScopedStorage::in_memory());
        manager.restore().await;

        let err = manager.login("testuser", "000000").await.unwrap_err();
        assert_eq!(err, SessionError::Rejected("Invalid username or PIN".to_string()));

        let state = manager.snapshot();
        assert!(state.user.is_none());
        assert_eq!(state.error.as_deref(), Some("Invalid username or PIN"));
        assert_eq!(manager.storage().read_session().unwrap(), None);
    }

    #[tokio::test]
    async fn test_login_failure_without_message_uses_default() {
        let backend = backend();
        backend.set_offline(true, None);
        let manager = manager_with(backend, ScopedStorage::in_memory());
        manager.restore().await;

        let err = manager.login("testuser", PIN).await.unwrap_err();
        assert_eq!(err.to_string(), "Login failed");
    }

    #[tokio::test]
    async fn test_fresh_login_clears_lock() {
        let storage = ScopedStorage::in_memory();
        storage.write_lock_flag(true).unwrap();

        let manager = manager_with(backend(), storage.clone());
        manager.restore().await;
        manager.login("testuser", PIN).await.unwrap();

        assert!(!manager.snapshot().is_locked);
        let flag = storage.read_lock_flag().unwrap();
        assert!(flag.is_none() || flag.as_deref() == Some("false"));
    }

    #[tokio::test]
    async fn test_logout_success() {
        let (backend, manager) = signed_in().await;
        manager.lock();

        manager.logout().await.unwrap();

        let state = manager.snapshot();
        assert!(state.user.is_none());
        assert!(!state.is_locked);
        assert_eq!(manager.storage().read_session().unwrap(), None);
        assert_eq!(manager.storage().read_lock_flag().unwrap(), None);
        assert_eq!(backend.logout_calls(), 1);
    }

    #[tokio::test]
    async fn test_logout_rollback() {
        let (backend, manager) = signed_in().await;
        manager.lock();
        backend.fail_logout_with(Some("Server unavailable"));

        let err = manager.logout().await.unwrap_err();
        assert_eq!(err, SessionError::Rejected("Server unavailable".to_string()));

        let state = manager.snapshot();
        assert_eq!(state.user, Some(Session::new(1, "testuser")));
        assert!(state.is_locked);
        assert_eq!(state.error.as_deref(), Some("Server unavailable"));
        assert!(manager.storage().read_session().unwrap().is_some());
        assert_eq!(manager.storage().read_lock_flag().unwrap().as_deref(), Some("true"));
    }

    #[tokio::test]
    async fn test_logout_clears_user_before_remote_call() {
        let (backend, manager) = signed_in().await;
        let manager = Arc::new(manager);
        backend.hold_logouts();

        let pending = tokio::spawn({
            let manager = manager.clone();
            async move { manager.logout().await }
        });
        tokio::task::yield_now().await;

        assert!(manager.snapshot().user.is_none());
        backend.release_logouts();
        pending.await.unwrap().unwrap();
        assert!(manager.snapshot().user.is_none());
    }

    #[tokio::test]
    async fn test_logout_during_login_is_not_resurrected() {
        let backend = backend();
        let manager = Arc::new(manager_with(backend.clone(), ScopedStorage::in_memory()));
        manager.restore().await;
        backend.hold_logins();

        let login = tokio::spawn({
            let manager = manager.clone();
            async move { manager.login("testuser", PIN).await }
        });
        tokio::task::yield_now().await;

        manager.logout().await.unwrap();
        backend.release_logins();

        assert_eq!(login.await.unwrap(), Err(SessionError::Superseded));
        assert!(manager.snapshot().user.is_none());
        assert_eq!(manager.storage().read_session().unwrap(), None);
    }

    #[tokio::test]
    async fn test_setup_clears_tutorial_markers() {
        let storage = ScopedStorage::in_memory();
        let keys = storage.keys().clone();
        storage.set(Tier::Durable, &keys.tutorial_completed, "true").unwrap();
        storage.set(Tier::Tab, &keys.tutorial_active, "true").unwrap();

        let manager = manager_with(Arc::new(FakeBackend::new()), storage.clone());
        manager.restore().await;
        let session = manager.setup(PIN, Some("newuser"), None).await.unwrap();

        assert_eq!(session.username, "newuser");
        assert_eq!(manager.snapshot().user, Some(session));
        assert_eq!(storage.get(Tier::Durable, &keys.tutorial_completed).unwrap(), None);
        assert_eq!(storage.get(Tier::Tab, &keys.tutorial_active).unwrap(), None);
    }

    #[tokio::test]
    async fn test_setup_failure() {
        let manager = manager_with(backend(), ScopedStorage::in_memory());
        manager.restore().await;

        let err = manager.setup(PIN, Some("testuser"), None).await.unwrap_err();
        assert_eq!(err.to_string(), "Username already exists");
        assert!(manager.snapshot().user.is_none());
    }

    #[tokio::test]
    async fn test_change_pin() {
        let (_, manager) = signed_in().await;

        manager.change_pin(PIN, "654321").await.unwrap();
        assert!(manager.snapshot().error.is_none());

        let err = manager.change_pin(PIN, "111111").await.unwrap_err();
        assert_eq!(err.to_string(), "Current PIN is incorrect");
        assert_eq!(manager.snapshot().error.as_deref(), Some("Current PIN is incorrect"));
        assert!(manager.snapshot().is_authenticated());
    }

    #[tokio::test]
    async fn test_change_username_updates_user_in_place() {
        let (_, manager) = signed_in().await;
        manager.lock();

        let username = manager.change_username("newname", PIN).await.unwrap();
        assert_eq!(username, "newname");

        let state = manager.snapshot();
        assert_eq!(state.user, Some(Session::new(1, "newname")));
        assert!(state.is_locked);

        let raw = manager.storage().read_session().unwrap().unwrap();
        assert_eq!(PersistedSession::parse(&raw).unwrap().user.username, "newname");
    }

    #[tokio::test]
    async fn test_change_username_failure_leaves_state() {
        let (_, manager) = signed_in().await;

        let err = manager.change_username("newname", "000000").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid PIN");
        assert_eq!(manager.snapshot().user, Some(Session::new(1, "testuser")));
    }

    #[tokio::test]
    async fn test_lock_and_unlock() {
        let (_, manager) = signed_in().await;

        manager.lock();
        assert!(manager.snapshot().is_locked);
        assert_eq!(manager.storage().read_lock_flag().unwrap().as_deref(), Some("true"));

        manager.unlock(PIN).await.unwrap();
        assert!(!manager.snapshot().is_locked);
        assert_eq!(manager.storage().read_lock_flag().unwrap(), None);
    }

    #[tokio::test]
    async fn test_lock_without_session_is_ignored() {
        let manager = manager_with(backend(), ScopedStorage::in_memory());
        manager.restore().await;

        manager.lock();

        let state = manager.snapshot();
        assert!(!state.is_locked);
        assert!(state.is_consistent());
        assert_eq!(manager.storage().read_lock_flag().unwrap(), None);
    }

    #[tokio::test]
    async fn test_unlock_without_session() {
        let backend = backend();
        let manager = manager_with(backend.clone(), ScopedStorage::in_memory());
        manager.restore().await;
        let before = manager.snapshot();

        let err = manager.unlock(PIN).await.unwrap_err();

        assert_eq!(err, SessionError::NoSession);
        assert_eq!(err.to_string(), "No user session");
        assert_eq!(manager.snapshot(), before);
        assert_eq!(backend.login_calls(), 0);
    }

    #[tokio::test]
    async fn test_unlock_wrong_pin_keeps_lock() {
        let (_, manager) = signed_in().await;
        manager.lock();

        let err = manager.unlock("000000").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid username or PIN");

        let state = manager.snapshot();
        assert!(state.is_locked);
        assert_eq!(state.error.as_deref(), Some("Invalid username or PIN"));
        assert_eq!(manager.storage().read_lock_flag().unwrap().as_deref(), Some("true"));
    }

    #[tokio::test]
    async fn test_unlock_when_not_locked_skips_backend() {
        let (backend, manager) = signed_in().await;
        let calls = backend.login_calls();

        manager.unlock(PIN).await.unwrap();
        assert_eq!(backend.login_calls(), calls);
    }

    #[tokio::test]
    async fn test_concurrent_unlocks_are_serialized() {
        let (backend, manager) = signed_in().await;
        let manager = Arc::new(manager);
        manager.lock();
        let calls = backend.login_calls();
        backend.hold_logins();

        let first = tokio::spawn({
            let manager = manager.clone();
            async move { manager.unlock(PIN).await }
        });
        let second = tokio::spawn({
            let manager = manager.clone();
            async move { manager.unlock(PIN).await }
        });
        tokio::task::yield_now().await;
        backend.release_logins();

        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();
        assert!(!manager.snapshot().is_locked);
        assert_eq!(backend.login_calls(), calls + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unlock_resets_activity() {
        let (_, manager) = signed_in().await;
        manager.lock();
        tokio::time::advance(Duration::from_secs(600)).await;

        manager.unlock(PIN).await.unwrap();
        assert!(manager.idle_for() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lock_if_idle() {
        let (_, manager) = signed_in().await;
        let threshold = Duration::from_secs(60);

        assert!(!manager.lock_if_idle(threshold));
        tokio::time::advance(Duration::from_secs(30)).await;
        manager.update_activity();
        tokio::time::advance(Duration::from_secs(45)).await;
        assert!(!manager.lock_if_idle(threshold));
        assert_eq!(manager.time_until_lock(threshold), Some(Duration::from_secs(15)));

        tokio::time::advance(Duration::from_secs(15)).await;
        assert!(manager.lock_if_idle(threshold));
        assert!(manager.snapshot().is_locked);
        assert_eq!(manager.time_until_lock(threshold), None);
        assert!(!manager.lock_if_idle(threshold));
    }

    #[tokio::test]
    async fn test_clear_error() {
        let manager = manager_with(backend(), ScopedStorage::in_memory());
        manager.restore().await;
        let _ = manager.login("testuser", "bad").await;
        assert!(manager.snapshot().error.is_some());

        manager.clear_error();
        assert!(manager.snapshot().error.is_none());
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let manager = manager_with(backend(), ScopedStorage::in_memory());
        let mut rx = manager.subscribe();
        assert!(rx.borrow_and_update().is_loading);

        manager.restore().await;
        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().is_loading);

        manager.login("testuser", PIN).await.unwrap();
        assert!(rx.borrow_and_update().is_authenticated());
    }
}
