//! Route handlers: auth endpoints plus health and root.

pub mod auth;
pub mod health;
pub mod root;
