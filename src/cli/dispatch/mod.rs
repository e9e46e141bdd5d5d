//! Map parsed CLI arguments to the action the binary runs.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, limits, ARG_PORT};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let auth_opts = auth::Options::parse(matches)?;
    let limit_opts = limits::Options::parse(matches);

    Ok(Action::Server(Args {
        port,
        secret_password: auth_opts.secret_password,
        frontend_url: auth_opts.frontend_url,
        production: auth_opts.production,
        trust_proxy: auth_opts.trust_proxy,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        session_idle_seconds: auth_opts.session_idle_seconds,
        session_sweep_seconds: auth_opts.session_sweep_seconds,
        login_max_attempts: limit_opts.login_max_attempts,
        login_lockout_seconds: limit_opts.login_lockout_seconds,
        rate_limit_max_requests: limit_opts.rate_limit_max_requests,
        rate_limit_window_seconds: limit_opts.rate_limit_window_seconds,
        rate_limit_sweep_seconds: limit_opts.rate_limit_sweep_seconds,
    }))
}
