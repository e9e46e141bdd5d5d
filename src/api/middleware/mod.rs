//! Request middleware shared by every route.
//!
//! Order, outermost first: security headers, rate limit, input sanitizing.
//! The rate limiter resolves the [`ClientIdentity`] once and later layers and
//! handlers reuse it.

mod client;
mod headers;
mod rate_limit;
mod sanitize;

pub use client::ClientIdentity;
pub use headers::security_headers;
pub use rate_limit::rate_limit;
pub use sanitize::{sanitize_input, MAX_BODY_BYTES};
