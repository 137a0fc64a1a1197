//! Wiring between the manager, the activity monitor, and the auto-lock scheduler
//!
//! The supervisor watches published state. It keeps the activity monitor
//! attached while unlocked, fetches the auto-lock threshold whenever the signed-in
//! identity changes, and re-fetches it periodically or on request.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::activity::{ActivityMonitor, ActivitySource};
use crate::autolock::AutoLockScheduler;
use crate::backend::{BackendResult, SettingsSupplier};
use crate::config::SessionConfig;
use crate::manager::SessionManager;
use crate::types::SessionState;

/// Background task owning the monitor and scheduler
///
/// Dropping the supervisor cancels the task, which detaches the monitor and
/// stops the scheduler.
pub struct SessionSupervisor {
    manager: Arc<SessionManager>,
    refresh: Arc<Notify>,
    threshold_rx: watch::Receiver<Option<u32>>,
    task: JoinHandle<()>,
}

impl SessionSupervisor {
    /// Start supervising `manager`; must be called from within a Tokio runtime
    pub fn spawn(
        manager: Arc<SessionManager>,
        settings: Arc<dyn SettingsSupplier>,
        source: ActivitySource,
        config: &SessionConfig,
    ) -> Self {
        let refresh = Arc::new(Notify::new());
        let (threshold_tx, threshold_rx) = watch::channel(None);
        let (fetched_tx, fetched_rx) = mpsc::unbounded_channel();
        let worker = Worker {
            state_rx: manager.subscribe(),
            monitor: ActivityMonitor::new(manager.clone(), source),
            scheduler: AutoLockScheduler::new(manager.clone(), config.check_interval()),
            manager: manager.clone(),
            settings,
            refresh: refresh.clone(),
            refresh_every: config.settings_refresh(),
            threshold_tx,
            fetched_tx,
            fetch: None,
            user_id: None,
        };

        Self {
            manager,
            refresh,
            threshold_rx,
            task: tokio::spawn(worker.run(fetched_rx)),
        }
    }

    /// The supervised manager
    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    /// Auto-lock threshold in effect, in minutes; `None` while disabled
    pub fn auto_lock_minutes(&self) -> Option<u32> {
        *self.threshold_rx.borrow()
    }

    /// Re-fetch the auto-lock threshold now, e.g. after the user changed it
    pub fn refresh_settings(&self) {
        self.refresh.notify_one();
    }

    /// Stop supervising; the monitor is detached and the scheduler stopped
    /// once the task unwinds
    pub fn shutdown(self) {
        self.task.abort();
    }
}

impl Drop for SessionSupervisor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct Worker {
    manager: Arc<SessionManager>,
    settings: Arc<dyn SettingsSupplier>,
    state_rx: watch::Receiver<SessionState>,
    monitor: ActivityMonitor,
    scheduler: AutoLockScheduler,
    refresh: Arc<Notify>,
    refresh_every: Duration,
    threshold_tx: watch::Sender<Option<u32>>,
    fetched_tx: mpsc::UnboundedSender<Fetched>,
    fetch: Option<JoinHandle<()>>,
    user_id: Option<i64>,
}

/// Outcome of a threshold fetch, tagged with the identity it was made for
type Fetched = (i64, BackendResult<Option<u32>>);

impl Worker {
    async fn run(mut self, mut fetched_rx: mpsc::UnboundedReceiver<Fetched>) {
        let mut refresh_tick = tokio::time::interval(self.refresh_every);
        refresh_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        refresh_tick.reset();

        let state = self.state_rx.borrow_and_update().clone();
        self.apply(&state);

        loop {
            tokio::select! {
                changed = self.state_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = self.state_rx.borrow_and_update().clone();
                    self.apply(&state);
                }
                Some((user_id, result)) = fetched_rx.recv() => self.finish_fetch(user_id, result),
                _ = refresh_tick.tick() => self.reload_threshold(),
                _ = self.refresh.notified() => self.reload_threshold(),
            }
        }
        debug!("Session supervisor stopped");
    }

    fn apply(&mut self, state: &SessionState) {
        self.monitor.sync(state);

        let user_id = state.user.as_ref().map(|user| user.id);
        if user_id == self.user_id {
            return;
        }
        self.user_id = user_id;

        match user_id {
            Some(id) => self.start_fetch(id),
            None => {
                self.cancel_fetch();
                self.scheduler.deactivate();
                self.publish_threshold();
            }
        }
    }

    fn reload_threshold(&mut self) {
        if let Some(id) = self.user_id {
            self.start_fetch(id);
        }
    }

    /// Fetch off the loop so lock transitions keep syncing the monitor
    fn start_fetch(&mut self, user_id: i64) {
        self.cancel_fetch();
        let settings = self.settings.clone();
        let fetched_tx = self.fetched_tx.clone();
        self.fetch = Some(tokio::spawn(async move {
            let result = settings.auto_lock_minutes().await;
            let _ = fetched_tx.send((user_id, result));
        }));
    }

    fn cancel_fetch(&mut self) {
        if let Some(fetch) = self.fetch.take() {
            fetch.abort();
        }
    }

    fn finish_fetch(&mut self, user_id: i64, result: BackendResult<Option<u32>>) {
        match result {
            Ok(minutes) => {
                let current = self.manager.snapshot().user.map(|user| user.id);
                if self.user_id != Some(user_id) || current != Some(user_id) {
                    debug!("Ignoring auto-lock setting fetched for a previous session");
                    return;
                }
                self.scheduler.activate(minutes.unwrap_or(0));
                self.publish_threshold();
            }
            Err(e) => warn!("Failed to load auto-lock setting: {}", e),
        }
    }

    fn publish_threshold(&self) {
        self.threshold_tx.send_replace(self.scheduler.threshold_minutes());
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.cancel_fetch();
    }
}
