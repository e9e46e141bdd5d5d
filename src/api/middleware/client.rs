use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, Extensions, HeaderMap},
};
use std::{convert::Infallible, fmt, net::SocketAddr};

/// The key every per-client limit is tracked under.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    pub const UNKNOWN: &'static str = "unknown";

    /// Resolve the client from the socket peer, or from proxy headers when
    /// the deployment sits behind a trusted reverse proxy.
    #[must_use]
    pub fn from_parts(headers: &HeaderMap, extensions: &Extensions, trust_proxy: bool) -> Self {
        let forwarded = trust_proxy.then(|| forwarded_client(headers)).flatten();
        let peer = || {
            extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        };

        Self(
            forwarded
                .or_else(peer)
                .unwrap_or_else(|| Self::UNKNOWN.to_string()),
        )
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Prefers the identity resolved by the rate-limit middleware; without it
/// only the socket peer is trusted.
#[async_trait]
impl<S> FromRequestParts<S> for ClientIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Self>()
            .cloned()
            .unwrap_or_else(|| Self::from_parts(&parts.headers, &parts.extensions, false)))
    }
}

fn forwarded_client(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if forwarded.is_some() {
        return forwarded.map(str::to_string);
    }
    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn proxied_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("1.2.3.4, 5.6.7.8"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        headers
    }

    fn peer(addr: &str) -> Extensions {
        let mut extensions = Extensions::new();
        if let Ok(addr) = addr.parse::<SocketAddr>() {
            extensions.insert(ConnectInfo(addr));
        }
        extensions
    }

    #[test]
    fn uses_peer_address_by_default() {
        let identity = ClientIdentity::from_parts(&proxied_headers(), &peer("10.0.0.7:5555"), false);
        assert_eq!(identity.as_str(), "10.0.0.7");
    }

    #[test]
    fn trusted_proxy_prefers_forwarded_for() {
        let identity = ClientIdentity::from_parts(&proxied_headers(), &peer("10.0.0.7:5555"), true);
        assert_eq!(identity.as_str(), "1.2.3.4");
    }

    #[test]
    fn trusted_proxy_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        let identity = ClientIdentity::from_parts(&headers, &Extensions::new(), true);
        assert_eq!(identity.as_str(), "9.9.9.9");
    }

    #[test]
    fn trusted_proxy_without_headers_uses_peer() {
        let identity = ClientIdentity::from_parts(&HeaderMap::new(), &peer("[::1]:80"), true);
        assert_eq!(identity.as_str(), "::1");
    }

    #[test]
    fn unknown_when_nothing_is_available() {
        let identity = ClientIdentity::from_parts(&HeaderMap::new(), &Extensions::new(), false);
        assert_eq!(identity.as_str(), ClientIdentity::UNKNOWN);
    }
}
