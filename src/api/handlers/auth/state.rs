//! Auth configuration and the shared state handed to every request.

use std::{sync::Arc, time::Duration};

use super::{gateway::AuthGateway, verifier::CredentialVerifier};
use crate::clock::Clock;
use crate::security::{
    login_throttle::{DEFAULT_LOCKOUT, DEFAULT_MAX_ATTEMPTS},
    rate_limit::{DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW},
    sessions::{DEFAULT_INACTIVITY_LIMIT, DEFAULT_SESSION_TTL},
    LoginThrottle, RequestRateLimiter, SessionStore, Sweeper,
};

pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
const DEFAULT_RATE_LIMIT_SWEEP: Duration = Duration::from_secs(5 * 60);
const DEFAULT_SESSION_SWEEP: Duration = Duration::from_secs(60 * 60);

#[derive(Clone, Debug)]
pub struct AuthConfig {
    production: bool,
    frontend_url: String,
    trust_proxy: bool,
    session_ttl: Duration,
    session_idle: Duration,
    login_max_attempts: u32,
    login_lockout: Duration,
    rate_limit_max_requests: u32,
    rate_limit_window: Duration,
    rate_limit_sweep: Duration,
    session_sweep: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            production: false,
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            trust_proxy: false,
            session_ttl: DEFAULT_SESSION_TTL,
            session_idle: DEFAULT_INACTIVITY_LIMIT,
            login_max_attempts: DEFAULT_MAX_ATTEMPTS,
            login_lockout: DEFAULT_LOCKOUT,
            rate_limit_max_requests: DEFAULT_MAX_REQUESTS,
            rate_limit_window: DEFAULT_WINDOW,
            rate_limit_sweep: DEFAULT_RATE_LIMIT_SWEEP,
            session_sweep: DEFAULT_SESSION_SWEEP,
        }
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_production(mut self, production: bool) -> Self {
        self.production = production;
        self
    }

    #[must_use]
    pub fn with_frontend_url(mut self, url: impl Into<String>) -> Self {
        // Origins never carry a trailing slash.
        self.frontend_url = url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_trust_proxy(mut self, trust: bool) -> Self {
        self.trust_proxy = trust;
        self
    }

    #[must_use]
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_session_idle(mut self, idle: Duration) -> Self {
        self.session_idle = idle;
        self
    }

    #[must_use]
    pub fn with_login_max_attempts(mut self, attempts: u32) -> Self {
        self.login_max_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_login_lockout(mut self, lockout: Duration) -> Self {
        self.login_lockout = lockout;
        self
    }

    #[must_use]
    pub fn with_rate_limit_max_requests(mut self, max: u32) -> Self {
        self.rate_limit_max_requests = max;
        self
    }

    #[must_use]
    pub fn with_rate_limit_window(mut self, window: Duration) -> Self {
        self.rate_limit_window = window;
        self
    }

    #[must_use]
    pub fn with_rate_limit_sweep(mut self, every: Duration) -> Self {
        self.rate_limit_sweep = every;
        self
    }

    #[must_use]
    pub fn with_session_sweep(mut self, every: Duration) -> Self {
        self.session_sweep = every;
        self
    }

    #[must_use]
    pub fn production(&self) -> bool {
        self.production
    }

    #[must_use]
    pub fn frontend_url(&self) -> &str {
        &self.frontend_url
    }

    #[must_use]
    pub fn trust_proxy(&self) -> bool {
        self.trust_proxy
    }

    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    #[must_use]
    pub fn session_idle(&self) -> Duration {
        self.session_idle
    }

    #[must_use]
    pub fn login_max_attempts(&self) -> u32 {
        self.login_max_attempts
    }

    #[must_use]
    pub fn login_lockout(&self) -> Duration {
        self.login_lockout
    }

    #[must_use]
    pub fn rate_limit_max_requests(&self) -> u32 {
        self.rate_limit_max_requests
    }

    #[must_use]
    pub fn rate_limit_window(&self) -> Duration {
        self.rate_limit_window
    }

    #[must_use]
    pub fn rate_limit_sweep(&self) -> Duration {
        self.rate_limit_sweep
    }

    #[must_use]
    pub fn session_sweep(&self) -> Duration {
        self.session_sweep
    }

    /// Session cookies are only marked `Secure` in production.
    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.production
    }

    /// Production frontends live on another site, so the cookie must travel
    /// cross-site; locally `Lax` is enough.
    #[must_use]
    pub fn same_site(&self) -> &'static str {
        if self.production {
            "None"
        } else {
            "Lax"
        }
    }
}

#[derive(Debug)]
pub struct AuthState {
    config: AuthConfig,
    sessions: Arc<SessionStore>,
    throttle: Arc<LoginThrottle>,
    rate_limiter: Arc<RequestRateLimiter>,
    gateway: AuthGateway,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        verifier: Arc<dyn CredentialVerifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let sessions = Arc::new(SessionStore::new(
            clock.clone(),
            config.session_ttl(),
            config.session_idle(),
        ));
        let throttle = Arc::new(LoginThrottle::new(
            clock.clone(),
            config.login_max_attempts(),
            config.login_lockout(),
        ));
        let rate_limiter = Arc::new(RequestRateLimiter::new(
            clock,
            config.rate_limit_max_requests(),
            config.rate_limit_window(),
        ));
        let gateway = AuthGateway::new(sessions.clone(), throttle.clone(), verifier);

        Self {
            config,
            sessions,
            throttle,
            rate_limiter,
            gateway,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn gateway(&self) -> &AuthGateway {
        &self.gateway
    }

    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    #[must_use]
    pub fn throttle(&self) -> &Arc<LoginThrottle> {
        &self.throttle
    }

    #[must_use]
    pub fn rate_limiter(&self) -> &Arc<RequestRateLimiter> {
        &self.rate_limiter
    }

    /// Sweep jobs for every store, not yet started.
    #[must_use]
    pub fn sweeper(&self) -> Sweeper {
        Sweeper::new()
            .with_job(self.rate_limiter.clone(), self.config.rate_limit_sweep())
            .with_job(self.throttle.clone(), self.config.rate_limit_sweep())
            .with_job(self.sessions.clone(), self.config.session_sweep())
    }
}
