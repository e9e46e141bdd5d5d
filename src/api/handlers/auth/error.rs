//! Client-facing auth failures and their HTTP mapping.

use axum::{
    http::{header::RETRY_AFTER, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use tracing::error;

use super::types::ErrorResponse;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing password")]
    BadRequest,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("rate limited, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AuthError {
    /// Internal failures are logged server-side and surface as a bare `500`.
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest => json_error(StatusCode::BAD_REQUEST, "Missing password."),
            Self::InvalidCredentials => json_error(StatusCode::UNAUTHORIZED, "Invalid password."),
            Self::RateLimited {
                retry_after_seconds,
            } => too_many(
                "Too many login attempts. Please try again later.",
                retry_after_seconds,
            ),
            Self::Unauthenticated => json_error(StatusCode::UNAUTHORIZED, "Unauthorized."),
            Self::Internal(err) => {
                error!("Auth request failed: {err:#}");
                internal_error_response()
            }
        }
    }
}

pub(crate) fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}

/// `429` with both the JSON `retryAfter` field and a `Retry-After` header.
pub(crate) fn too_many(message: &str, retry_after_seconds: u64) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(RETRY_AFTER, HeaderValue::from(retry_after_seconds));
    (
        StatusCode::TOO_MANY_REQUESTS,
        headers,
        Json(ErrorResponse::new(message).with_retry_after(retry_after_seconds)),
    )
        .into_response()
}

pub(crate) fn internal_error_response() -> Response {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.")
}
