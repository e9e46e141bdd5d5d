use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use std::sync::Arc;
use tracing::{error, instrument};

use super::{
    cookie::session_cookie,
    error::{internal_error_response, AuthError},
    gateway::Credential,
    state::AuthState,
    types::{ErrorResponse, LoginRequest, SuccessResponse},
};
use crate::api::middleware::ClientIdentity;

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session created; `auth` cookie set", body = SuccessResponse),
        (status = 400, description = "Missing password", body = ErrorResponse),
        (status = 401, description = "Invalid password", body = ErrorResponse),
        (status = 429, description = "Too many login attempts", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip_all, fields(client = %client))]
pub async fn login(
    client: ClientIdentity,
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let credential = payload
        .as_ref()
        .map_or(Credential::Missing, |Json(body)| body.credential());
    let token = state.gateway().login_with(credential, client.as_str())?;

    let cookie = match session_cookie(state.config(), &token) {
        Ok(cookie) => cookie,
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            state.gateway().logout(Some(&token));
            return Ok(internal_error_response());
        }
    };

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);
    Ok((StatusCode::OK, headers, Json(SuccessResponse::ok())).into_response())
}
