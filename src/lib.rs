//! # Warden
//!
//! `warden` guards a single admin account behind a password login and an
//! opaque session cookie. Everything lives in memory: a restart logs the
//! admin out and forgets every throttle counter.
//!
//! ## Request pipeline
//!
//! Every request passes through security headers, a per-client fixed-window
//! rate limit (100 requests per 15 minutes) and a best-effort input
//! sanitizer before it reaches a handler.
//!
//! ## Sessions
//!
//! A login replaces any previous session. Sessions expire 24 hours after
//! creation or after 2 hours without a `/check`, whichever comes first.
//! Expired entries are rejected on read and purged by a background sweeper.

pub mod api;
pub mod cli;
pub mod clock;
pub mod security;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(GIT_COMMIT_HASH.len() >= 7);
    }
}
