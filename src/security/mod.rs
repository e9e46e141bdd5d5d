//! Stateful security primitives: sessions, login throttling, request rate
//! limiting, input sanitization and the background sweeper.
//!
//! Every store keeps its map behind a single mutex held for one map operation
//! at a time. Request paths recover from poisoning; sweeps only `try_lock` so
//! a busy store skips the cycle instead of stalling the sweeper.

pub mod login_throttle;
pub mod rate_limit;
pub mod sanitize;
pub mod sessions;
pub mod sweeper;

pub use login_throttle::LoginThrottle;
pub use rate_limit::{RateLimitDecision, RequestRateLimiter};
pub use sessions::{SessionRecord, SessionStore};
pub use sweeper::{Sweep, Sweeper, SweeperHandle};

use std::sync::{Mutex, MutexGuard, TryLockError};
use tracing::warn;

fn try_lock_for_sweep<'a, T>(mutex: &'a Mutex<T>, store: &str) -> Option<MutexGuard<'a, T>> {
    match mutex.try_lock() {
        Ok(guard) => Some(guard),
        Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
        Err(TryLockError::WouldBlock) => {
            warn!(store, "Store busy, skipping sweep");
            None
        }
    }
}
