//! User activity tracking
//!
//! [`ActivitySource`] is the root input source: the front end dispatches every
//! pointer, key, scroll, and touch event into it. [`ActivityMonitor`] keeps a
//! single listener registered on that source while a user is signed in and
//! unlocked, and forwards each event to
//! [`SessionManager::update_activity`](crate::SessionManager::update_activity).

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::debug;

use crate::manager::SessionManager;
use crate::types::SessionState;

/// Kinds of input that count as activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivitySignal {
    PointerDown,
    PointerMove,
    KeyDown,
    Scroll,
    TouchStart,
    Click,
}

impl ActivitySignal {
    /// Every signal kind
    pub const ALL: [ActivitySignal; 6] = [
        ActivitySignal::PointerDown,
        ActivitySignal::PointerMove,
        ActivitySignal::KeyDown,
        ActivitySignal::Scroll,
        ActivitySignal::TouchStart,
        ActivitySignal::Click,
    ];
}

type Handler = Arc<dyn Fn(ActivitySignal) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    handlers: Mutex<BTreeMap<u64, Handler>>,
}

impl Registry {
    fn handlers(&self) -> MutexGuard<'_, BTreeMap<u64, Handler>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Root input source that activity listeners attach to
#[derive(Clone, Default)]
pub struct ActivitySource {
    registry: Arc<Registry>,
}

impl ActivitySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler; it stays registered until the guard is dropped
    pub fn listen(&self, handler: impl Fn(ActivitySignal) + Send + Sync + 'static) -> ListenerGuard {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.handlers().insert(id, Arc::new(handler));
        ListenerGuard {
            registry: Arc::downgrade(&self.registry),
            id,
        }
    }

    /// Deliver a signal to every registered handler
    pub fn dispatch(&self, signal: ActivitySignal) {
        // Handlers run outside the registry lock so they may register or drop listeners
        let handlers: Vec<Handler> = self.registry.handlers().values().cloned().collect();
        for handler in handlers {
            handler(signal);
        }
    }

    /// Number of registered handlers
    pub fn listener_count(&self) -> usize {
        self.registry.handlers().len()
    }
}

impl std::fmt::Debug for ActivitySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivitySource")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Registration handle; dropping it removes the handler
#[must_use = "the listener is removed when the guard is dropped"]
pub struct ListenerGuard {
    registry: Weak<Registry>,
    id: u64,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.handlers().remove(&self.id);
        }
    }
}

/// Forwards input activity to the session manager while unlocked
pub struct ActivityMonitor {
    manager: Arc<SessionManager>,
    source: ActivitySource,
    listener: Option<ListenerGuard>,
}

impl ActivityMonitor {
    pub fn new(manager: Arc<SessionManager>, source: ActivitySource) -> Self {
        Self {
            manager,
            source,
            listener: None,
        }
    }

    /// Attach or detach for the given state
    ///
    /// Attached exactly when a user is present and unlocked. Idempotent.
    pub fn sync(&mut self, state: &SessionState) {
        if state.is_unlocked() {
            self.attach();
        } else {
            self.detach();
        }
    }

    /// Whether the listener is currently registered
    pub fn is_attached(&self) -> bool {
        self.listener.is_some()
    }

    fn attach(&mut self) {
        if self.listener.is_some() {
            return;
        }
        let manager = Arc::downgrade(&self.manager);
        self.listener = Some(self.source.listen(move |_signal| {
            if let Some(manager) = manager.upgrade() {
                manager.update_activity();
            }
        }));
        debug!("Activity monitor attached");
    }

    fn detach(&mut self) {
        if self.listener.take().is_some() {
            debug!("Activity monitor detached");
        }
    }
}

impl Drop for ActivityMonitor {
    fn drop(&mut self) {
        self.detach();
    }
}
