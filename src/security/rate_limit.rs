//! Fixed-window request rate limiting per client identity.
//!
//! Each client gets a counter that resets at a fixed boundary. A client can
//! therefore squeeze up to twice the cap through around a window edge; that
//! burst is accepted rather than paying for a sliding window.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

use super::{sweeper::Sweep, try_lock_for_sweep};
use crate::clock::{as_millis, Clock};

pub const DEFAULT_MAX_REQUESTS: u32 = 100;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(15 * 60);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited { retry_after_seconds: u64 },
}

impl RateLimitDecision {
    #[must_use]
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }
}

#[derive(Clone, Copy, Debug)]
struct Window {
    count: u32,
    reset_at: u64,
}

pub struct RequestRateLimiter {
    windows: Mutex<HashMap<String, Window>>,
    clock: Arc<dyn Clock>,
    max_requests: u32,
    window: Duration,
}

impl fmt::Debug for RequestRateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestRateLimiter")
            .field("max_requests", &self.max_requests)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl RequestRateLimiter {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, max_requests: u32, window: Duration) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            clock,
            max_requests,
            window,
        }
    }

    /// Count a request from `identity` and decide whether it may proceed.
    pub fn admit(&self, identity: &str) -> RateLimitDecision {
        let now = self.clock.now_millis();
        let mut windows = self.lock();

        match windows.get_mut(identity) {
            Some(window) if now <= window.reset_at => {
                window.count = window.count.saturating_add(1);
                if window.count > self.max_requests {
                    let remaining = window.reset_at - now;
                    debug!(client = identity, count = window.count, "Request rate limited");
                    RateLimitDecision::Limited {
                        retry_after_seconds: remaining.div_ceil(1000),
                    }
                } else {
                    RateLimitDecision::Allowed
                }
            }
            // Missing or stale: start a fresh window instead of zeroing the old one.
            _ => {
                windows.insert(
                    identity.to_string(),
                    Window {
                        count: 1,
                        reset_at: now.saturating_add(as_millis(self.window)),
                    },
                );
                RateLimitDecision::Allowed
            }
        }
    }

    /// Drop windows whose reset time has passed.
    pub fn sweep(&self, now: u64) -> Option<usize> {
        let mut windows = try_lock_for_sweep(&self.windows, self.name())?;
        let before = windows.len();
        windows.retain(|_, window| now <= window.reset_at);
        Some(before - windows.len())
    }

    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Window>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Sweep for RequestRateLimiter {
    fn name(&self) -> &'static str {
        "rate_limits"
    }

    fn sweep_expired(&self) -> Option<usize> {
        self.sweep(self.clock.now_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn limiter(max: u32) -> (Arc<ManualClock>, RequestRateLimiter) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let limiter = RequestRateLimiter::new(clock.clone(), max, DEFAULT_WINDOW);
        (clock, limiter)
    }

    #[test]
    fn admits_exactly_the_cap_per_window() {
        let (_clock, limiter) = limiter(DEFAULT_MAX_REQUESTS);
        for _ in 0..DEFAULT_MAX_REQUESTS {
            assert_eq!(limiter.admit("10.0.0.1"), RateLimitDecision::Allowed);
        }

        match limiter.admit("10.0.0.1") {
            RateLimitDecision::Limited {
                retry_after_seconds,
            } => assert_eq!(retry_after_seconds, DEFAULT_WINDOW.as_secs()),
            RateLimitDecision::Allowed => panic!("101st request should be limited"),
        }
    }

    #[test]
    fn retry_after_rounds_up() {
        let (clock, limiter) = limiter(1);
        assert!(limiter.admit("a").is_allowed());

        clock.advance(Duration::from_millis(1_500));
        assert_eq!(
            limiter.admit("a"),
            RateLimitDecision::Limited {
                retry_after_seconds: DEFAULT_WINDOW.as_secs() - 1,
            }
        );
    }

    #[test]
    fn clients_are_independent() {
        let (_clock, limiter) = limiter(2);
        assert!(limiter.admit("a").is_allowed());
        assert!(limiter.admit("a").is_allowed());
        assert!(!limiter.admit("a").is_allowed());
        assert!(limiter.admit("b").is_allowed());
    }

    #[test]
    fn stale_window_restarts_at_one() {
        let (clock, limiter) = limiter(2);
        for _ in 0..5 {
            limiter.admit("a");
        }
        assert!(!limiter.admit("a").is_allowed());

        clock.advance(DEFAULT_WINDOW + Duration::from_millis(1));
        assert!(limiter.admit("a").is_allowed());
        assert!(limiter.admit("a").is_allowed());
        assert!(!limiter.admit("a").is_allowed());
    }

    #[test]
    fn boundary_burst_is_allowed() {
        let (clock, limiter) = limiter(3);
        assert!(limiter.admit("a").is_allowed());

        // Spend the rest of the budget right before the edge...
        clock.advance(DEFAULT_WINDOW - Duration::from_millis(1));
        assert!(limiter.admit("a").is_allowed());
        assert!(limiter.admit("a").is_allowed());

        // ...and a full budget right after it.
        clock.advance(Duration::from_millis(2));
        for _ in 0..3 {
            assert!(limiter.admit("a").is_allowed());
        }
        assert!(!limiter.admit("a").is_allowed());
    }

    #[test]
    fn sweep_removes_past_windows() {
        let (clock, limiter) = limiter(10);
        limiter.admit("a");
        clock.advance(Duration::from_secs(10 * 60));
        limiter.admit("b");
        clock.advance(Duration::from_secs(6 * 60));

        assert_eq!(limiter.sweep_expired(), Some(1));
        assert_eq!(limiter.tracked_clients(), 1);
    }
}
