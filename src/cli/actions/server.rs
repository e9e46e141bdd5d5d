use crate::{
    api::{
        self,
        handlers::auth::{AuthConfig, AuthState, SharedSecretVerifier},
    },
    clock::SystemClock,
};
use anyhow::{bail, Result};
use secrecy::{ExposeSecret, SecretString};
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub secret_password: SecretString,
    pub frontend_url: String,
    pub production: bool,
    pub trust_proxy: bool,
    pub session_ttl_seconds: u64,
    pub session_idle_seconds: u64,
    pub session_sweep_seconds: u64,
    pub login_max_attempts: u32,
    pub login_lockout_seconds: u64,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window_seconds: u64,
    pub rate_limit_sweep_seconds: u64,
}

impl Args {
    fn auth_config(&self) -> AuthConfig {
        AuthConfig::new()
            .with_production(self.production)
            .with_frontend_url(self.frontend_url.clone())
            .with_trust_proxy(self.trust_proxy)
            .with_session_ttl(Duration::from_secs(self.session_ttl_seconds))
            .with_session_idle(Duration::from_secs(self.session_idle_seconds))
            .with_session_sweep(Duration::from_secs(self.session_sweep_seconds))
            .with_login_max_attempts(self.login_max_attempts)
            .with_login_lockout(Duration::from_secs(self.login_lockout_seconds))
            .with_rate_limit_max_requests(self.rate_limit_max_requests)
            .with_rate_limit_window(Duration::from_secs(self.rate_limit_window_seconds))
            .with_rate_limit_sweep(Duration::from_secs(self.rate_limit_sweep_seconds))
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the admin secret is empty or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    if args.secret_password.expose_secret().is_empty() {
        bail!("--secret-password must not be empty");
    }
    if args.secret_password.expose_secret().chars().count()
        < api::handlers::auth::MIN_PASSWORD_LENGTH
    {
        warn!("Admin secret is shorter than the login policy minimum; every login will fail");
    }

    let auth_config = args.auth_config();
    debug!("Auth config: {:?}", auth_config);

    let state = Arc::new(AuthState::new(
        auth_config,
        Arc::new(SharedSecretVerifier::new(args.secret_password)),
        Arc::new(SystemClock),
    ));

    api::new(args.port, state).await
}
