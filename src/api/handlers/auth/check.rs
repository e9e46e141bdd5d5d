use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

use super::{
    cookie::{clear_session_cookie, extract_session_token},
    state::AuthState,
    types::{AuthorizedResponse, ErrorResponse},
};

#[utoipa::path(
    get,
    path = "/check",
    responses(
        (status = 200, description = "Session is valid", body = AuthorizedResponse),
        (status = 401, description = "No valid session; `auth` cookie cleared", body = ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn check(headers: HeaderMap, state: Extension<Arc<AuthState>>) -> Response {
    let token = extract_session_token(&headers);

    match state.gateway().check(token.as_deref()) {
        Ok(()) => (StatusCode::OK, Json(AuthorizedResponse { authorized: true })).into_response(),
        Err(err) => {
            let mut response = err.into_response();
            // A stale cookie is useless to the browser; drop it.
            if let Ok(cookie) = clear_session_cookie(state.config()) {
                response.headers_mut().insert(SET_COOKIE, cookie);
            }
            response
        }
    }
}
