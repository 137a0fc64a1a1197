//! Property-based tests for the session core using proptest
//!
//! Arbitrary sequences of operations must never break the state invariants, and
//! the persisted records must always describe the published state.

use std::sync::Arc;

use proptest::prelude::*;
use taskline_session::testing::FakeBackend;
use taskline_session::{PersistedSession, ScopedStorage, SessionManager, SessionState};

const USERNAME: &str = "ada";
const PIN: &str = "1234";
const WRONG_PIN: &str = "9999";

// ============================================
// Operations
// ============================================

#[derive(Debug, Clone)]
enum Op {
    Login { correct_pin: bool },
    Logout,
    Lock,
    Unlock { correct_pin: bool },
    ExpireRemote,
    Offline(bool),
    Restart,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => any::<bool>().prop_map(|correct_pin| Op::Login { correct_pin }),
        1 => Just(Op::Logout),
        3 => Just(Op::Lock),
        3 => any::<bool>().prop_map(|correct_pin| Op::Unlock { correct_pin }),
        1 => Just(Op::ExpireRemote),
        1 => any::<bool>().prop_map(Op::Offline),
        2 => Just(Op::Restart),
    ]
}

fn pin(correct: bool) -> &'static str {
    if correct {
        PIN
    } else {
        WRONG_PIN
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Records on disk agree with the published state
fn assert_mirrored(state: &SessionState, storage: &ScopedStorage) {
    let persisted = storage
        .read_session()
        .unwrap()
        .and_then(|raw| PersistedSession::parse(&raw))
        .map(|record| record.user);
    assert_eq!(persisted, state.user);

    let flag = storage.read_lock_flag().unwrap();
    assert_eq!(flag.as_deref() == Some("true"), state.is_locked);
}

async fn apply(op: &Op, backend: &Arc<FakeBackend>, manager: &mut SessionManager) {
    match op {
        Op::Login { correct_pin } => {
            let _ = manager.login(USERNAME, pin(*correct_pin)).await;
        }
        Op::Logout => {
            let _ = manager.logout().await;
        }
        Op::Lock => manager.lock(),
        Op::Unlock { correct_pin } => {
            let _ = manager.unlock(pin(*correct_pin)).await;
        }
        Op::ExpireRemote => backend.set_session_valid(false),
        Op::Offline(offline) => backend.set_offline(*offline, None),
        Op::Restart => {
            let storage = manager.storage().clone();
            *manager = SessionManager::new(backend.clone(), storage);
            manager.restore().await;
        }
    }
}

proptest! {
    #[test]
    fn prop_operations_preserve_invariants(ops in prop::collection::vec(arb_op(), 1..40)) {
        runtime().block_on(async {
            let backend = Arc::new(FakeBackend::new().with_account(USERNAME, PIN));
            let mut manager = SessionManager::new(backend.clone(), ScopedStorage::in_memory());
            manager.restore().await;

            for op in &ops {
                let before = manager.snapshot();
                apply(op, &backend, &mut manager).await;
                let state = manager.snapshot();

                // Locked implies a user
                assert!(state.is_consistent(), "{:?} after {:?}", state, op);
                // Loading never comes back once restore finished
                assert!(!state.is_loading);
                assert_mirrored(&state, manager.storage());

                // Only a correct PIN releases the lock for the same user
                if before.is_locked && state.is_unlocked() && before.user == state.user {
                    assert!(
                        matches!(op, Op::Unlock { correct_pin: true } | Op::Login { correct_pin: true }),
                        "{:?}",
                        op
                    );
                }
            }
        });
    }

    #[test]
    fn prop_restart_reproduces_state(ops in prop::collection::vec(arb_op(), 1..20)) {
        runtime().block_on(async {
            let backend = Arc::new(FakeBackend::new().with_account(USERNAME, PIN));
            let mut manager = SessionManager::new(backend.clone(), ScopedStorage::in_memory());
            manager.restore().await;

            for op in &ops {
                apply(op, &backend, &mut manager).await;
            }

            let before = manager.snapshot();
            backend.set_offline(false, None);
            apply(&Op::Restart, &backend, &mut manager).await;
            let after = manager.snapshot();

            // A valid remote session comes back exactly; otherwise it is dropped
            if after.user.is_some() {
                assert_eq!(after.user, before.user);
                assert_eq!(after.is_locked, before.is_locked);
            } else {
                assert!(!after.is_locked);
            }
        });
    }
}
