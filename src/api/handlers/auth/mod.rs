//! Single-account authentication: login, session check and logout.
//!
//! A successful `POST /login` replaces any existing session of the admin
//! principal and hands the new token back in an `HttpOnly` cookie named
//! `auth`. `GET /check` validates the cookie and refreshes its idle timer.
//!
//! ## Limits
//!
//! - **Sessions:** 24 hours absolute lifetime, 2 hours of inactivity.
//! - **Login throttle:** 5 failures per client lock it out for 15 minutes.
//!   Locked attempts are answered with `429` and are not counted.

pub mod check;
mod cookie;
pub(crate) mod error;
pub mod gateway;
pub mod login;
pub mod logout;
mod state;
pub(crate) mod types;
pub mod verifier;

pub use cookie::SESSION_COOKIE_NAME;
pub use error::AuthError;
pub use gateway::{AuthGateway, Credential, ADMIN_PRINCIPAL, MIN_PASSWORD_LENGTH};
pub use state::{AuthConfig, AuthState, DEFAULT_FRONTEND_URL};
pub use types::{AuthorizedResponse, ErrorResponse, LoginRequest, SuccessResponse};
pub use verifier::{CredentialVerifier, SharedSecretVerifier};
