//! Request and response payloads for the auth endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::gateway::Credential;

/// Any JSON type is accepted for `password` so that a non-string value is
/// rejected as a wrong password instead of failing to deserialize.
#[derive(ToSchema, Deserialize, Debug, Default)]
pub struct LoginRequest {
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub password: Option<Value>,
}

impl LoginRequest {
    #[must_use]
    pub fn credential(&self) -> Credential<'_> {
        match &self.password {
            None | Some(Value::Null | Value::Bool(false)) => Credential::Missing,
            Some(Value::String(text)) if text.is_empty() => Credential::Missing,
            Some(Value::String(text)) => Credential::Text(text.as_str()),
            Some(Value::Number(number)) if number.as_f64() == Some(0.0) => Credential::Missing,
            Some(_) => Credential::Malformed,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    #[must_use]
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct AuthorizedResponse {
    pub authorized: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(
        rename = "retryAfter",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub retry_after: Option<u64>,
}

impl ErrorResponse {
    #[must_use]
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
            retry_after: None,
        }
    }

    #[must_use]
    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }
}
