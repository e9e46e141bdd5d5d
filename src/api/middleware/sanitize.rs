use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        uri::PathAndQuery,
        HeaderMap, StatusCode, Uri,
    },
    middleware::Next,
    response::Response,
};
use http_body_util::LengthLimitError;
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::handlers::auth::error::json_error;
use crate::security::sanitize::{sanitize, sanitize_query_if_needed};

pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Scrub the query string and any JSON body before the handler sees them.
///
/// Bodies that are not valid JSON are forwarded untouched so the handler's
/// own extractor reports the problem.
pub async fn sanitize_input(request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();

    if let Some(uri) = rewrite_query(&parts.uri) {
        parts.uri = uri;
    }

    let body = if is_json(&parts.headers) {
        let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
            Ok(bytes) => bytes,
            Err(err) if exceeds_limit(&err) => {
                warn!("Rejected oversized request body: {err}");
                return json_error(StatusCode::PAYLOAD_TOO_LARGE, "Payload too large.");
            }
            Err(err) => {
                warn!("Failed to read request body: {err}");
                return json_error(StatusCode::BAD_REQUEST, "Invalid request body.");
            }
        };

        match serde_json::from_slice::<Value>(&bytes).map(sanitize) {
            Ok(cleaned) => match serde_json::to_vec(&cleaned) {
                Ok(encoded) => {
                    parts.headers.remove(CONTENT_LENGTH);
                    Body::from(encoded)
                }
                Err(err) => {
                    debug!("Failed to re-encode sanitized body: {err}");
                    Body::from(bytes)
                }
            },
            Err(_) => Body::from(bytes),
        }
    } else {
        body
    };

    next.run(Request::from_parts(parts, body)).await
}

fn exceeds_limit(err: &axum::Error) -> bool {
    std::error::Error::source(err).is_some_and(|source| source.is::<LengthLimitError>())
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| {
            let mime = mime.trim();
            mime.eq_ignore_ascii_case("application/json")
                || (mime.starts_with("application/") && mime.ends_with("+json"))
        })
}

fn rewrite_query(uri: &Uri) -> Option<Uri> {
    let cleaned = sanitize_query_if_needed(uri.query()?)?;

    let path_and_query = if cleaned.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{cleaned}", uri.path())
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query.parse::<PathAndQuery>().ok()?);
    Uri::from_parts(parts).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http,
        middleware::from_fn,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/echo",
                post(|Json(body): Json<Value>| async move { Json(body) }),
            )
            .route(
                "/query",
                get(|uri: Uri| async move { uri.query().unwrap_or_default().to_string() }),
            )
            .layer(from_fn(sanitize_input))
    }

    async fn body_bytes(response: Response) -> anyhow::Result<Vec<u8>> {
        Ok(to_bytes(response.into_body(), usize::MAX).await?.to_vec())
    }

    #[tokio::test]
    async fn json_body_is_scrubbed() -> anyhow::Result<()> {
        let payload = json!({
            "name": "<b>bob</b>",
            "link": "javascript:alert(1)",
            "tags": ["<i>", "onload=x()"],
            "n": 3
        });
        let response = app()
            .oneshot(
                http::Request::builder()
                    .method("POST")
                    .uri("/echo")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(payload.to_string()))?,
            )
            .await?;

        assert_eq!(response.status(), StatusCode::OK);
        let echoed: Value = serde_json::from_slice(&body_bytes(response).await?)?;
        assert_eq!(
            echoed,
            json!({ "name": "bbob/b", "link": "alert(1)", "tags": ["i", "x()"], "n": 3 })
        );
        Ok(())
    }

    #[tokio::test]
    async fn query_is_scrubbed() -> anyhow::Result<()> {
        let response = app()
            .oneshot(
                http::Request::builder()
                    .uri("/query?q=%3Cscript%3E&redirect=javascript%3Aalert(1)")
                    .body(Body::empty())?,
            )
            .await?;

        let query = String::from_utf8(body_bytes(response).await?)?;
        assert_eq!(query, "q=script&redirect=alert%281%29");
        Ok(())
    }

    #[tokio::test]
    async fn clean_query_is_left_alone() -> anyhow::Result<()> {
        let response = app()
            .oneshot(
                http::Request::builder()
                    .uri("/query?page=2&sort=asc")
                    .body(Body::empty())?,
            )
            .await?;

        let query = String::from_utf8(body_bytes(response).await?)?;
        assert_eq!(query, "page=2&sort=asc");
        Ok(())
    }

    #[tokio::test]
    async fn harmless_query_keeps_its_encoding() -> anyhow::Result<()> {
        let response = app()
            .oneshot(
                http::Request::builder()
                    .uri("/query?a%20b&flag")
                    .body(Body::empty())?,
            )
            .await?;

        let query = String::from_utf8(body_bytes(response).await?)?;
        assert_eq!(query, "a%20b&flag");
        Ok(())
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() -> anyhow::Result<()> {
        let big = format!("\"{}\"", "a".repeat(MAX_BODY_BYTES + 1));
        let response = app()
            .oneshot(
                http::Request::builder()
                    .method("POST")
                    .uri("/echo")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(big))?,
            )
            .await?;

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        Ok(())
    }

    #[tokio::test]
    async fn broken_body_stream_is_a_bad_request() -> anyhow::Result<()> {
        let chunks = futures_util::stream::iter(vec![
            Ok::<_, std::io::Error>("{\"password\":"),
            Err(std::io::Error::other("connection reset")),
        ]);
        let response = app()
            .oneshot(
                http::Request::builder()
                    .method("POST")
                    .uri("/echo")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from_stream(chunks))?,
            )
            .await?;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(&body_bytes(response).await?)?;
        assert_eq!(body, json!({ "error": "Invalid request body." }));
        Ok(())
    }

    #[tokio::test]
    async fn only_length_errors_exceed_the_limit() {
        let too_long = to_bytes(Body::from("0123456789"), 4).await;
        assert!(too_long.is_err_and(|err| exceeds_limit(&err)));

        let reset = axum::Error::new(std::io::Error::other("connection reset"));
        assert!(!exceeds_limit(&reset));
    }

    #[test]
    fn detects_json_content_types() {
        let mut headers = HeaderMap::new();
        assert!(!is_json(&headers));

        headers.insert(CONTENT_TYPE, "application/json; charset=utf-8".parse().expect("header"));
        assert!(is_json(&headers));

        headers.insert(CONTENT_TYPE, "application/merge-patch+json".parse().expect("header"));
        assert!(is_json(&headers));

        headers.insert(CONTENT_TYPE, "text/plain".parse().expect("header"));
        assert!(!is_json(&headers));
    }
}
