use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_SECRET_PASSWORD: &str = "secret-password";
pub const ARG_FRONTEND_URL: &str = "frontend-url";
pub const ARG_PRODUCTION: &str = "production";
pub const ARG_TRUST_PROXY: &str = "trust-proxy";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_SESSION_IDLE_SECONDS: &str = "session-idle-seconds";
pub const ARG_SESSION_SWEEP_SECONDS: &str = "session-sweep-seconds";

#[derive(Debug)]
pub struct Options {
    pub secret_password: SecretString,
    pub frontend_url: String,
    pub production: bool,
    pub trust_proxy: bool,
    pub session_ttl_seconds: u64,
    pub session_idle_seconds: u64,
    pub session_sweep_seconds: u64,
}

impl Options {
    /// # Errors
    /// Returns an error if the admin secret is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let secret_password = matches
            .get_one::<String>(ARG_SECRET_PASSWORD)
            .cloned()
            .map(SecretString::from)
            .context("missing required argument: --secret-password")?;

        Ok(Self {
            secret_password,
            frontend_url: matches
                .get_one::<String>(ARG_FRONTEND_URL)
                .cloned()
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            production: matches.get_flag(ARG_PRODUCTION),
            trust_proxy: matches.get_flag(ARG_TRUST_PROXY),
            session_ttl_seconds: seconds(matches, ARG_SESSION_TTL_SECONDS, 86_400),
            session_idle_seconds: seconds(matches, ARG_SESSION_IDLE_SECONDS, 7_200),
            session_sweep_seconds: seconds(matches, ARG_SESSION_SWEEP_SECONDS, 3_600),
        })
    }
}

pub(super) fn seconds(matches: &ArgMatches, id: &str, default: u64) -> u64 {
    matches.get_one::<u64>(id).copied().unwrap_or(default)
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SECRET_PASSWORD)
                .long(ARG_SECRET_PASSWORD)
                .help("Admin password accepted by POST /login")
                .env("WARDEN_SECRET_PASSWORD")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_FRONTEND_URL)
                .long(ARG_FRONTEND_URL)
                .help("Frontend origin allowed by CORS in production")
                .env("WARDEN_FRONTEND_URL")
                .default_value("http://localhost:3000"),
        )
        .arg(
            Arg::new(ARG_PRODUCTION)
                .long(ARG_PRODUCTION)
                .help("Production mode: Secure cookies, SameSite=None, strict CORS")
                .env("WARDEN_PRODUCTION")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_TRUST_PROXY)
                .long(ARG_TRUST_PROXY)
                .help("Identify clients by X-Forwarded-For / X-Real-IP")
                .env("WARDEN_TRUST_PROXY")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Absolute session lifetime in seconds")
                .env("WARDEN_SESSION_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_SESSION_IDLE_SECONDS)
                .long(ARG_SESSION_IDLE_SECONDS)
                .help("Session inactivity limit in seconds")
                .env("WARDEN_SESSION_IDLE_SECONDS")
                .default_value("7200")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_SESSION_SWEEP_SECONDS)
                .long(ARG_SESSION_SWEEP_SECONDS)
                .help("Interval between expired-session sweeps in seconds")
                .env("WARDEN_SESSION_SWEEP_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
