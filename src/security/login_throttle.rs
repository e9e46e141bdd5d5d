//! Per-client brute-force protection for the login endpoint.
//!
//! Counts consecutive failed logins per client identity (not per account), so
//! one noisy client cannot lock the admin out for everybody else.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

use super::{sweeper::Sweep, try_lock_for_sweep};
use crate::clock::{as_millis, Clock};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_LOCKOUT: Duration = Duration::from_secs(15 * 60);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct AttemptCounter {
    count: u32,
    last_attempt: u64,
}

impl AttemptCounter {
    fn is_stale(&self, now: u64, lockout: u64) -> bool {
        now.saturating_sub(self.last_attempt) > lockout
    }
}

pub struct LoginThrottle {
    attempts: Mutex<HashMap<String, AttemptCounter>>,
    clock: Arc<dyn Clock>,
    max_attempts: u32,
    lockout: Duration,
}

impl fmt::Debug for LoginThrottle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginThrottle")
            .field("max_attempts", &self.max_attempts)
            .field("lockout", &self.lockout)
            .finish_non_exhaustive()
    }
}

impl LoginThrottle {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, max_attempts: u32, lockout: Duration) -> Self {
        Self {
            attempts: Mutex::new(HashMap::new()),
            clock,
            max_attempts,
            lockout,
        }
    }

    #[must_use]
    pub fn lockout(&self) -> Duration {
        self.lockout
    }

    /// True while `identity` has used up its attempts and the lockout window
    /// since its last failure has not elapsed.
    ///
    /// A lapsed counter reads as unlocked but stays in the map until the next
    /// [`record`](Self::record) or sweep.
    pub fn is_locked(&self, identity: &str) -> bool {
        let now = self.clock.now_millis();
        let lockout = as_millis(self.lockout);
        self.lock().get(identity).is_some_and(|counter| {
            counter.count >= self.max_attempts && !counter.is_stale(now, lockout)
        })
    }

    pub fn record(&self, identity: &str, success: bool) {
        let mut attempts = self.lock();

        if success {
            attempts.remove(identity);
            return;
        }

        let now = self.clock.now_millis();
        let lockout = as_millis(self.lockout);
        let counter = attempts
            .entry(identity.to_string())
            .or_insert(AttemptCounter {
                count: 0,
                last_attempt: now,
            });

        if counter.is_stale(now, lockout) {
            counter.count = 0;
        }
        counter.count = counter.count.saturating_add(1);
        counter.last_attempt = now;

        if counter.count >= self.max_attempts {
            warn!(client = identity, attempts = counter.count, "Login locked out");
        } else {
            debug!(client = identity, attempts = counter.count, "Failed login recorded");
        }
    }

    /// Current failure count for `identity`, ignoring staleness.
    #[must_use]
    pub fn failures(&self, identity: &str) -> u32 {
        self.lock().get(identity).map_or(0, |counter| counter.count)
    }

    /// Drop counters whose lockout window has lapsed.
    pub fn sweep(&self, now: u64) -> Option<usize> {
        let lockout = as_millis(self.lockout);
        let mut attempts = try_lock_for_sweep(&self.attempts, self.name())?;
        let before = attempts.len();
        attempts.retain(|_, counter| !counter.is_stale(now, lockout));
        Some(before - attempts.len())
    }

    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, AttemptCounter>> {
        self.attempts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Sweep for LoginThrottle {
    fn name(&self) -> &'static str {
        "login_attempts"
    }

    fn sweep_expired(&self) -> Option<usize> {
        self.sweep(self.clock.now_millis())
    }
}
