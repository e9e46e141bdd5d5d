//! In-memory session store.
//!
//! Tokens are opaque random strings handed to the client as the `auth` cookie.
//! A record is live while `now <= expires_at` and the idle gap since the last
//! successful validation stays within the inactivity limit. Dead records are
//! dropped lazily by [`SessionStore::validate_and_touch`] and in bulk by
//! [`SessionStore::sweep`].

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

use super::{sweeper::Sweep, try_lock_for_sweep};
use crate::clock::{as_millis, Clock};

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_INACTIVITY_LIMIT: Duration = Duration::from_secs(2 * 60 * 60);

const TOKEN_BYTES: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionRecord {
    principal: String,
    expires_at: u64,
    last_activity: u64,
}

impl SessionRecord {
    #[must_use]
    pub fn principal(&self) -> &str {
        &self.principal
    }

    #[must_use]
    pub fn expires_at(&self) -> u64 {
        self.expires_at
    }

    #[must_use]
    pub fn last_activity(&self) -> u64 {
        self.last_activity
    }

    fn is_live(&self, now: u64, inactivity_limit: u64) -> bool {
        now <= self.expires_at && now.saturating_sub(self.last_activity) <= inactivity_limit
    }
}

pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionRecord>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    inactivity_limit: Duration,
}

impl fmt::Debug for SessionStore {
    // Never print tokens.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("ttl", &self.ttl)
            .field("inactivity_limit", &self.inactivity_limit)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration, inactivity_limit: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            clock,
            ttl,
            inactivity_limit,
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    #[must_use]
    pub fn inactivity_limit(&self) -> Duration {
        self.inactivity_limit
    }

    /// Mint a session for `principal` and return its token.
    ///
    /// # Errors
    /// Returns an error if the OS random number generator fails.
    pub fn create(&self, principal: &str) -> Result<String> {
        let token = generate_session_token()?;
        let now = self.clock.now_millis();
        let record = SessionRecord {
            principal: principal.to_string(),
            expires_at: now.saturating_add(as_millis(self.ttl)),
            last_activity: now,
        };

        self.lock().insert(token.clone(), record);
        debug!(principal, "Session created");

        Ok(token)
    }

    /// The authorization check for protected requests.
    ///
    /// Unknown tokens are rejected; expired or idle ones are removed and
    /// rejected; live ones have their activity timestamp refreshed.
    pub fn validate_and_touch(&self, token: &str) -> bool {
        let now = self.clock.now_millis();
        let inactivity_limit = as_millis(self.inactivity_limit);
        let mut sessions = self.lock();

        let Some(record) = sessions.get_mut(token) else {
            return false;
        };

        if record.is_live(now, inactivity_limit) {
            record.last_activity = now;
            true
        } else {
            sessions.remove(token);
            debug!("Expired session evicted on access");
            false
        }
    }

    /// Look up a live record without refreshing it.
    #[must_use]
    pub fn get(&self, token: &str) -> Option<SessionRecord> {
        let now = self.clock.now_millis();
        let inactivity_limit = as_millis(self.inactivity_limit);
        self.lock()
            .get(token)
            .filter(|record| record.is_live(now, inactivity_limit))
            .cloned()
    }

    pub fn invalidate(&self, token: &str) {
        self.lock().remove(token);
    }

    /// Remove every session owned by `principal`, returning how many were dropped.
    pub fn invalidate_all_for_principal(&self, principal: &str) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, record| record.principal != principal);
        before - sessions.len()
    }

    /// Drop every record that is no longer live at `now`.
    ///
    /// Returns `None` when the store is busy and the cycle was skipped.
    pub fn sweep(&self, now: u64) -> Option<usize> {
        let inactivity_limit = as_millis(self.inactivity_limit);
        let mut sessions = try_lock_for_sweep(&self.sessions, self.name())?;
        let before = sessions.len();
        sessions.retain(|_, record| record.is_live(now, inactivity_limit));
        Some(before - sessions.len())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionRecord>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Sweep for SessionStore {
    fn name(&self) -> &'static str {
        "sessions"
    }

    fn sweep_expired(&self) -> Option<usize> {
        self.sweep(self.clock.now_millis())
    }
}

/// 32 random bytes from the OS, base64url without padding.
pub(crate) fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}
