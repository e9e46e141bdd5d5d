//! Login, check and logout orchestration over the in-memory stores.
//!
//! The gateway owns no HTTP concerns; handlers translate its results into
//! responses and cookies.

use std::{fmt, sync::Arc};
use tracing::{debug, info};

use super::{error::AuthError, verifier::CredentialVerifier};
use crate::security::{LoginThrottle, SessionStore};

/// The single account this gate protects.
pub const ADMIN_PRINCIPAL: &str = "admin";

pub const MIN_PASSWORD_LENGTH: usize = 8;

const WEAK_PASSWORDS: [&str; 5] = ["password", "123456", "admin", "test", "qwerty"];

/// A login password as it arrived in the request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential<'a> {
    /// Absent, `null`, empty, `false` or `0`.
    Missing,
    Text(&'a str),
    /// Present but not a string, e.g. a number or an object.
    Malformed,
}

pub struct AuthGateway {
    sessions: Arc<SessionStore>,
    throttle: Arc<LoginThrottle>,
    verifier: Arc<dyn CredentialVerifier>,
    principal: String,
}

impl fmt::Debug for AuthGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthGateway")
            .field("principal", &self.principal)
            .finish_non_exhaustive()
    }
}

impl AuthGateway {
    #[must_use]
    pub fn new(
        sessions: Arc<SessionStore>,
        throttle: Arc<LoginThrottle>,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> Self {
        Self {
            sessions,
            throttle,
            verifier,
            principal: ADMIN_PRINCIPAL.to_string(),
        }
    }

    #[must_use]
    pub fn with_principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = principal.into();
        self
    }

    #[must_use]
    pub fn principal(&self) -> &str {
        &self.principal
    }

    /// Exchange a password for a fresh session token.
    ///
    /// A locked-out client is rejected before anything is recorded. Every
    /// other failure counts against the client; success clears its counter
    /// and replaces any existing session of the principal.
    ///
    /// # Errors
    /// `RateLimited`, `BadRequest`, `InvalidCredentials`, or `Internal` when
    /// no token could be generated.
    pub fn login(&self, password: Option<&str>, client: &str) -> Result<String, AuthError> {
        self.login_with(password.map_or(Credential::Missing, Credential::Text), client)
    }

    /// Like [`AuthGateway::login`], but also accepts a password that was sent
    /// with the wrong type. Such a password counts as a wrong one.
    ///
    /// # Errors
    /// Same as [`AuthGateway::login`].
    pub fn login_with(
        &self,
        credential: Credential<'_>,
        client: &str,
    ) -> Result<String, AuthError> {
        if self.throttle.is_locked(client) {
            debug!(client, "Login rejected while locked out");
            return Err(AuthError::RateLimited {
                retry_after_seconds: self.throttle.lockout().as_secs(),
            });
        }

        let password = match credential {
            Credential::Text(password) if !password.is_empty() => password,
            Credential::Missing | Credential::Text(_) => {
                self.throttle.record(client, false);
                return Err(AuthError::BadRequest);
            }
            Credential::Malformed => {
                self.throttle.record(client, false);
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !meets_policy(password) || !self.verifier.verify(password) {
            self.throttle.record(client, false);
            return Err(AuthError::InvalidCredentials);
        }

        let replaced = self.sessions.invalidate_all_for_principal(&self.principal);
        let token = self.sessions.create(&self.principal)?;
        self.throttle.record(client, true);

        info!(client, replaced, "Login succeeded");
        Ok(token)
    }

    /// Validate a presented token, refreshing its activity on success.
    ///
    /// # Errors
    /// `Unauthenticated` when the token is missing, unknown or expired.
    pub fn check(&self, token: Option<&str>) -> Result<(), AuthError> {
        match token {
            Some(token) if self.sessions.validate_and_touch(token) => Ok(()),
            _ => Err(AuthError::Unauthenticated),
        }
    }

    pub fn logout(&self, token: Option<&str>) {
        if let Some(token) = token {
            self.sessions.invalidate(token);
        }
    }
}

/// Length is counted in UTF-16 code units, the way browsers count it.
fn meets_policy(password: &str) -> bool {
    password.encode_utf16().count() >= MIN_PASSWORD_LENGTH
        && !WEAK_PASSWORDS
            .iter()
            .any(|weak| weak.eq_ignore_ascii_case(password))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::security::{
        login_throttle::{DEFAULT_LOCKOUT, DEFAULT_MAX_ATTEMPTS},
        sessions::{DEFAULT_INACTIVITY_LIMIT, DEFAULT_SESSION_TTL},
    };
    use std::time::Duration;

    const PASSWORD: &str = "Correct-Horse-9";

    struct FixedVerifier(&'static str);

    impl CredentialVerifier for FixedVerifier {
        fn verify(&self, candidate: &str) -> bool {
            candidate == self.0
        }
    }

    struct Fixture {
        clock: Arc<ManualClock>,
        sessions: Arc<SessionStore>,
        throttle: Arc<LoginThrottle>,
        gateway: AuthGateway,
    }

    fn fixture_with(verifier: Arc<dyn CredentialVerifier>) -> Fixture {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let shared: Arc<dyn Clock> = clock.clone();
        let sessions = Arc::new(SessionStore::new(
            shared.clone(),
            DEFAULT_SESSION_TTL,
            DEFAULT_INACTIVITY_LIMIT,
        ));
        let throttle = Arc::new(LoginThrottle::new(
            shared,
            DEFAULT_MAX_ATTEMPTS,
            DEFAULT_LOCKOUT,
        ));
        let gateway = AuthGateway::new(sessions.clone(), throttle.clone(), verifier);
        Fixture {
            clock,
            sessions,
            throttle,
            gateway,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Arc::new(FixedVerifier(PASSWORD)))
    }

    #[test]
    fn login_then_check_then_logout() -> anyhow::Result<()> {
        let fx = fixture();
        let token = fx.gateway.login(Some(PASSWORD), "10.0.0.1")?;

        assert!(fx.gateway.check(Some(&token)).is_ok());
        fx.gateway.logout(Some(&token));
        assert!(matches!(
            fx.gateway.check(Some(&token)),
            Err(AuthError::Unauthenticated)
        ));
        Ok(())
    }

    #[test]
    fn check_without_token_is_unauthenticated() {
        let fx = fixture();
        assert!(matches!(
            fx.gateway.check(None),
            Err(AuthError::Unauthenticated)
        ));
        assert!(matches!(
            fx.gateway.check(Some("forged")),
            Err(AuthError::Unauthenticated)
        ));
    }

    #[test]
    fn logout_without_token_is_a_no_op() {
        let fx = fixture();
        fx.gateway.logout(None);
        fx.gateway.logout(Some("never-issued"));
        assert!(fx.sessions.is_empty());
    }

    #[test]
    fn missing_or_empty_password_is_bad_request_and_counts() {
        let fx = fixture();
        assert!(matches!(
            fx.gateway.login(None, "c"),
            Err(AuthError::BadRequest)
        ));
        assert!(matches!(
            fx.gateway.login(Some(""), "c"),
            Err(AuthError::BadRequest)
        ));
        assert_eq!(fx.throttle.failures("c"), 2);
    }

    #[test]
    fn non_string_password_is_invalid_credentials_and_counts() {
        let fx = fixture();
        assert!(matches!(
            fx.gateway.login_with(Credential::Malformed, "c"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            fx.gateway.login_with(Credential::Missing, "c"),
            Err(AuthError::BadRequest)
        ));
        assert_eq!(fx.throttle.failures("c"), 2);
        assert!(fx.sessions.is_empty());
    }

    #[test]
    fn length_counts_utf16_units() -> anyhow::Result<()> {
        // Four astral-plane characters are eight UTF-16 units.
        const LOCKS: &str = "\u{1F510}\u{1F511}\u{1F512}\u{1F513}";
        let fx = fixture_with(Arc::new(FixedVerifier(LOCKS)));
        fx.gateway.login(Some(LOCKS), "c")?;
        assert!(!meets_policy("\u{e9}\u{e9}\u{e9}\u{e9}\u{e9}\u{e9}\u{e9}"));
        Ok(())
    }

    #[test]
    fn policy_rejects_short_and_weak_passwords() {
        let fx = fixture_with(Arc::new(FixedVerifier("PASSWORD")));
        for candidate in ["short", "PASSWORD", "Password", "qwerty"] {
            assert!(matches!(
                fx.gateway.login(Some(candidate), "c"),
                Err(AuthError::InvalidCredentials)
            ));
        }
        assert!(fx.sessions.is_empty());
    }

    #[test]
    fn wrong_password_is_invalid_credentials() {
        let fx = fixture();
        assert!(matches!(
            fx.gateway.login(Some("Wrong-Horse-9"), "c"),
            Err(AuthError::InvalidCredentials)
        ));
        assert_eq!(fx.throttle.failures("c"), 1);
    }

    #[test]
    fn five_failures_lock_even_the_right_password() {
        let fx = fixture();
        for _ in 0..5 {
            let _ = fx.gateway.login(Some("Wrong-Horse-9"), "c");
        }

        match fx.gateway.login(Some(PASSWORD), "c") {
            Err(AuthError::RateLimited {
                retry_after_seconds,
            }) => assert_eq!(retry_after_seconds, 900),
            other => panic!("expected lockout, got {other:?}"),
        }
        // Locked attempts are not recorded.
        assert_eq!(fx.throttle.failures("c"), 5);
        assert!(fx.sessions.is_empty());
    }

    #[test]
    fn lockout_lapses_after_fifteen_minutes() -> anyhow::Result<()> {
        let fx = fixture();
        for _ in 0..5 {
            let _ = fx.gateway.login(Some("Wrong-Horse-9"), "c");
        }
        fx.clock.advance(DEFAULT_LOCKOUT + Duration::from_millis(1));

        let token = fx.gateway.login(Some(PASSWORD), "c")?;
        assert!(fx.gateway.check(Some(&token)).is_ok());
        assert_eq!(fx.throttle.failures("c"), 0);
        Ok(())
    }

    #[test]
    fn lockout_is_per_client() -> anyhow::Result<()> {
        let fx = fixture();
        for _ in 0..5 {
            let _ = fx.gateway.login(Some("Wrong-Horse-9"), "attacker");
        }
        fx.gateway.login(Some(PASSWORD), "operator")?;
        Ok(())
    }

    #[test]
    fn new_login_replaces_previous_session() -> anyhow::Result<()> {
        let fx = fixture();
        let first = fx.gateway.login(Some(PASSWORD), "laptop")?;
        let second = fx.gateway.login(Some(PASSWORD), "phone")?;

        assert_ne!(first, second);
        assert!(fx.gateway.check(Some(&first)).is_err());
        assert!(fx.gateway.check(Some(&second)).is_ok());
        assert_eq!(fx.sessions.len(), 1);
        Ok(())
    }

    #[test]
    fn success_clears_earlier_failures() -> anyhow::Result<()> {
        let fx = fixture();
        for _ in 0..4 {
            let _ = fx.gateway.login(Some("Wrong-Horse-9"), "c");
        }
        fx.gateway.login(Some(PASSWORD), "c")?;
        assert_eq!(fx.throttle.failures("c"), 0);
        Ok(())
    }

    #[test]
    fn principal_is_configurable() -> anyhow::Result<()> {
        let fx = fixture();
        let gateway = AuthGateway::new(
            fx.sessions.clone(),
            fx.throttle.clone(),
            Arc::new(FixedVerifier(PASSWORD)),
        )
        .with_principal("operator");
        assert_eq!(fx.gateway.principal(), ADMIN_PRINCIPAL);
        assert_eq!(gateway.principal(), "operator");

        let token = gateway.login(Some(PASSWORD), "c")?;
        let record = fx.sessions.get(&token);
        assert_eq!(record.map(|r| r.principal().to_string()), Some("operator".into()));
        Ok(())
    }
}
