use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use super::ClientIdentity;
use crate::api::handlers::auth::{error::too_many, AuthState};
use crate::security::RateLimitDecision;

/// Per-client fixed-window request limit, applied to every route.
///
/// The resolved [`ClientIdentity`] is stored in the request extensions so
/// handlers track the same key.
pub async fn rate_limit(
    State(state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let client = ClientIdentity::from_parts(
        request.headers(),
        request.extensions(),
        state.config().trust_proxy(),
    );

    match state.rate_limiter().admit(client.as_str()) {
        RateLimitDecision::Allowed => {
            request.extensions_mut().insert(client);
            next.run(request).await
        }
        RateLimitDecision::Limited {
            retry_after_seconds,
        } => {
            warn!(
                client = %client,
                retry_after_seconds,
                "Rate limit exceeded"
            );
            too_many("Too many requests", retry_after_seconds)
        }
    }
}
