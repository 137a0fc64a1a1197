//! Inactivity-based auto-lock
//!
//! While active, a background task samples the manager's idle time once per
//! check interval (and once immediately) and engages the lock when the idle
//! time reaches the configured threshold.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::manager::SessionManager;

/// Periodic inactivity check
pub struct AutoLockScheduler {
    manager: Arc<SessionManager>,
    check_interval: Duration,
    threshold_minutes: Option<u32>,
    task: Option<JoinHandle<()>>,
}

impl AutoLockScheduler {
    pub fn new(manager: Arc<SessionManager>, check_interval: Duration) -> Self {
        Self {
            manager,
            check_interval,
            threshold_minutes: None,
            task: None,
        }
    }

    /// Start (or restart) checking with a threshold in minutes
    ///
    /// Zero deactivates. Reactivating with the current threshold keeps the
    /// running task. Must be called from within a Tokio runtime.
    pub fn activate(&mut self, minutes: u32) {
        if minutes == 0 {
            self.deactivate();
            return;
        }
        if self.is_active() && self.threshold_minutes == Some(minutes) {
            return;
        }

        self.stop();
        let threshold = Duration::from_secs(u64::from(minutes) * 60);
        let manager = self.manager.clone();
        let check_interval = self.check_interval;

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(check_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                // The first tick completes immediately
                ticker.tick().await;
                manager.lock_if_idle(threshold);
            }
        }));
        self.threshold_minutes = Some(minutes);
        info!("Auto-lock enabled after {} minute(s) of inactivity", minutes);
    }

    /// Stop checking
    pub fn deactivate(&mut self) {
        if self.stop() {
            info!("Auto-lock disabled");
        }
        self.threshold_minutes = None;
    }

    /// Whether a check task is running
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Current threshold in minutes, if active
    pub fn threshold_minutes(&self) -> Option<u32> {
        self.threshold_minutes.filter(|_| self.is_active())
    }

    fn stop(&mut self) -> bool {
        match self.task.take() {
            Some(task) => {
                task.abort();
                debug!("Auto-lock task stopped");
                true
            }
            None => false,
        }
    }
}

impl Drop for AutoLockScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
