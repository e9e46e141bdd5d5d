use clap::{Arg, ArgMatches, Command};

use super::auth::seconds;

pub const ARG_LOGIN_MAX_ATTEMPTS: &str = "login-max-attempts";
pub const ARG_LOGIN_LOCKOUT_SECONDS: &str = "login-lockout-seconds";
pub const ARG_RATE_LIMIT_MAX_REQUESTS: &str = "rate-limit-max-requests";
pub const ARG_RATE_LIMIT_WINDOW_SECONDS: &str = "rate-limit-window-seconds";
pub const ARG_RATE_LIMIT_SWEEP_SECONDS: &str = "rate-limit-sweep-seconds";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub login_max_attempts: u32,
    pub login_lockout_seconds: u64,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window_seconds: u64,
    pub rate_limit_sweep_seconds: u64,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        Self {
            login_max_attempts: count(matches, ARG_LOGIN_MAX_ATTEMPTS, 5),
            login_lockout_seconds: seconds(matches, ARG_LOGIN_LOCKOUT_SECONDS, 900),
            rate_limit_max_requests: count(matches, ARG_RATE_LIMIT_MAX_REQUESTS, 100),
            rate_limit_window_seconds: seconds(matches, ARG_RATE_LIMIT_WINDOW_SECONDS, 900),
            rate_limit_sweep_seconds: seconds(matches, ARG_RATE_LIMIT_SWEEP_SECONDS, 300),
        }
    }
}

fn count(matches: &ArgMatches, id: &str, default: u32) -> u32 {
    matches.get_one::<u32>(id).copied().unwrap_or(default)
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_LOGIN_MAX_ATTEMPTS)
                .long(ARG_LOGIN_MAX_ATTEMPTS)
                .help("Failed logins allowed per client before lockout")
                .env("WARDEN_LOGIN_MAX_ATTEMPTS")
                .default_value("5")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new(ARG_LOGIN_LOCKOUT_SECONDS)
                .long(ARG_LOGIN_LOCKOUT_SECONDS)
                .help("Lockout duration after too many failed logins")
                .env("WARDEN_LOGIN_LOCKOUT_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_RATE_LIMIT_MAX_REQUESTS)
                .long(ARG_RATE_LIMIT_MAX_REQUESTS)
                .help("Requests allowed per client per window")
                .env("WARDEN_RATE_LIMIT_MAX_REQUESTS")
                .default_value("100")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new(ARG_RATE_LIMIT_WINDOW_SECONDS)
                .long(ARG_RATE_LIMIT_WINDOW_SECONDS)
                .help("Request rate-limit window in seconds")
                .env("WARDEN_RATE_LIMIT_WINDOW_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_RATE_LIMIT_SWEEP_SECONDS)
                .long(ARG_RATE_LIMIT_SWEEP_SECONDS)
                .help("Interval between rate-limit and login-throttle sweeps")
                .env("WARDEN_RATE_LIMIT_SWEEP_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
