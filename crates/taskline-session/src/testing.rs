//! In-memory collaborators for exercising the session core
//!
//! Enabled for this crate's own tests and, through the `testing` feature, for
//! downstream test crates.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::backend::{
    AuthBackend, BackendResult, ChangePinRequest, ChangeUsernameRequest, SettingsSupplier,
    SetupRequest,
};
use crate::error::BackendError;
use crate::types::Session;

#[derive(Debug, Clone)]
struct Account {
    id: i64,
    pin: String,
}

/// Scriptable [`AuthBackend`]
///
/// Logging in or setting up marks the remote credential valid; logging out
/// invalidates it. Logins and logouts can be held open to stage races.
pub struct FakeBackend {
    accounts: Mutex<HashMap<String, Account>>,
    current: Mutex<Option<String>>,
    next_id: AtomicI64,
    session_valid: AtomicBool,
    offline: Mutex<Option<BackendError>>,
    logout_failure: Mutex<Option<String>>,
    login_gate: watch::Sender<bool>,
    logout_gate: watch::Sender<bool>,
    login_calls: AtomicUsize,
    logout_calls: AtomicUsize,
    validate_calls: AtomicUsize,
}

impl FakeBackend {
    /// A backend with no accounts
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            current: Mutex::new(None),
            next_id: AtomicI64::new(1),
            session_valid: AtomicBool::new(false),
            offline: Mutex::new(None),
            logout_failure: Mutex::new(None),
            login_gate: watch::channel(false).0,
            logout_gate: watch::channel(false).0,
            login_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            validate_calls: AtomicUsize::new(0),
        }
    }

    /// Register an account; ids are handed out from 1
    pub fn with_account(self, username: &str, pin: &str) -> Self {
        self.insert_account(username, pin);
        self
    }

    /// Whether `validate_session` succeeds
    pub fn set_session_valid(&self, valid: bool) {
        self.session_valid.store(valid, Ordering::SeqCst);
    }

    /// Fail every call as if the server were unreachable
    pub fn set_offline(&self, offline: bool, message: Option<&str>) {
        *guard(&self.offline) = offline.then(|| match message {
            Some(message) => BackendError::new(message),
            None => BackendError::unspecified(),
        });
    }

    /// Make logout fail with `message`; `None` restores normal behavior
    pub fn fail_logout_with(&self, message: Option<&str>) {
        *guard(&self.logout_failure) = message.map(str::to_string);
    }

    /// Park logins until [`release_logins`](Self::release_logins)
    pub fn hold_logins(&self) {
        self.login_gate.send_replace(true);
    }

    /// Let parked logins continue
    pub fn release_logins(&self) {
        self.login_gate.send_replace(false);
    }

    /// Park logouts until [`release_logouts`](Self::release_logouts)
    pub fn hold_logouts(&self) {
        self.logout_gate.send_replace(true);
    }

    /// Let parked logouts continue
    pub fn release_logouts(&self) {
        self.logout_gate.send_replace(false);
    }

    /// Number of login calls (including unlock re-authentication)
    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    /// Number of logout calls
    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    /// Number of session validations
    pub fn validate_calls(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    fn insert_account(&self, username: &str, pin: &str) -> Session {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        guard(&self.accounts).insert(
            username.to_string(),
            Account {
                id,
                pin: pin.to_string(),
            },
        );
        Session::new(id, username)
    }

    fn check_online(&self) -> BackendResult<()> {
        match guard(&self.offline).clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn require_session(&self) -> BackendResult<(String, Account)> {
        if !self.session_valid.load(Ordering::SeqCst) {
            return Err(BackendError::new("Authentication required"));
        }
        let username = guard(&self.current)
            .clone()
            .ok_or_else(|| BackendError::new("Authentication required"))?;
        let account = guard(&self.accounts)
            .get(&username)
            .cloned()
            .ok_or_else(|| BackendError::new("User not found"))?;
        Ok((username, account))
    }

    fn sign_in(&self, username: &str) {
        *guard(&self.current) = Some(username.to_string());
        self.session_valid.store(true, Ordering::SeqCst);
    }
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

async fn wait_until_released(gate: &watch::Sender<bool>) {
    let mut rx = gate.subscribe();
    let _released = rx.wait_for(|held| !*held).await.is_ok();
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl AuthBackend for FakeBackend {
    async fn validate_session(&self) -> BackendResult<()> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        if self.session_valid.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BackendError::new("Authentication required"))
        }
    }

    async fn login(&self, username: &str, pin: &str) -> BackendResult<Session> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        wait_until_released(&self.login_gate).await;
        self.check_online()?;

        let account = guard(&self.accounts).get(username).cloned();
        match account {
            Some(account) if account.pin == pin => {
                self.sign_in(username);
                Ok(Session::new(account.id, username))
            }
            _ => Err(BackendError::new("Invalid username or PIN")),
        }
    }

    async fn logout(&self) -> BackendResult<()> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        wait_until_released(&self.logout_gate).await;
        self.check_online()?;

        if let Some(message) = guard(&self.logout_failure).clone() {
            return Err(BackendError::new(message));
        }
        *guard(&self.current) = None;
        self.session_valid.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn setup(&self, request: &SetupRequest) -> BackendResult<Session> {
        self.check_online()?;
        let username = request.username.as_deref().unwrap_or("admin");
        if guard(&self.accounts).contains_key(username) {
            return Err(BackendError::new("Username already exists"));
        }
        let session = self.insert_account(username, &request.pin);
        self.sign_in(username);
        Ok(session)
    }

    async fn change_pin(&self, request: &ChangePinRequest) -> BackendResult<()> {
        self.check_online()?;
        let (username, account) = self.require_session()?;
        if account.pin != request.current_pin {
            return Err(BackendError::new("Current PIN is incorrect"));
        }
        if let Some(stored) = guard(&self.accounts).get_mut(&username) {
            stored.pin = request.new_pin.clone();
        }
        Ok(())
    }

    async fn change_username(&self, request: &ChangeUsernameRequest) -> BackendResult<String> {
        self.check_online()?;
        let (username, account) = self.require_session()?;
        if account.pin != request.pin {
            return Err(BackendError::new("Invalid PIN"));
        }

        let mut accounts = guard(&self.accounts);
        if accounts.contains_key(&request.new_username) {
            return Err(BackendError::new("Username already exists"));
        }
        accounts.remove(&username);
        accounts.insert(request.new_username.clone(), account);
        drop(accounts);

        *guard(&self.current) = Some(request.new_username.clone());
        Ok(request.new_username.clone())
    }
}

/// Scriptable [`SettingsSupplier`]
///
/// Fetches can be held open to keep one in flight.
pub struct FixedSettings {
    minutes: Mutex<Option<u32>>,
    failing: AtomicBool,
    gate: watch::Sender<bool>,
    calls: AtomicUsize,
}

impl FixedSettings {
    /// Supply `minutes` until changed
    pub fn new(minutes: Option<u32>) -> Self {
        Self {
            minutes: Mutex::new(minutes),
            failing: AtomicBool::new(false),
            gate: watch::channel(false).0,
            calls: AtomicUsize::new(0),
        }
    }

    /// Park fetches until [`release`](Self::release)
    pub fn hold(&self) {
        self.gate.send_replace(true);
    }

    /// Let parked fetches continue
    pub fn release(&self) {
        self.gate.send_replace(false);
    }

    /// Change the supplied threshold
    pub fn set(&self, minutes: Option<u32>) {
        *guard(&self.minutes) = minutes;
    }

    /// Make fetches fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of fetches so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for FixedSettings {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl SettingsSupplier for FixedSettings {
    async fn auto_lock_minutes(&self) -> BackendResult<Option<u32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        wait_until_released(&self.gate).await;
        if self.failing.load(Ordering::SeqCst) {
            return Err(BackendError::new("Network error: Unable to reach the server"));
        }
        Ok(*guard(&self.minutes))
    }
}
