//! Client identity used as the rate-limit key.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{Extensions, HeaderMap};

use super::AppState;

/// Identity reported when neither a trusted header nor a peer address exists.
pub const UNKNOWN_IDENTITY: &str = "unknown";

/// Resolve the caller's identity.
///
/// With `trust_proxy` the first `X-Forwarded-For` hop wins; otherwise the
/// peer address from `ConnectInfo`, with IPv4-mapped IPv6 addresses folded
/// back to IPv4.
pub fn client_identity(headers: &HeaderMap, extensions: &Extensions, trust_proxy: bool) -> String {
    if trust_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|hop| !hop.is_empty());
        if let Some(hop) = forwarded {
            return hop.to_string();
        }
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_canonical().to_string())
        .unwrap_or_else(|| UNKNOWN_IDENTITY.to_string())
}

/// Extractor wrapping [`client_identity`] for form handlers.
pub struct ClientIdentity(pub String);

#[async_trait]
impl FromRequestParts<AppState> for ClientIdentity {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(client_identity(
            &parts.headers,
            &parts.extensions,
            state.trust_proxy_headers,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_peer(addr: &str) -> Extensions {
        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo(addr.parse::<SocketAddr>().unwrap()));
        extensions
    }

    #[test]
    fn test_peer_address() {
        let identity = client_identity(&HeaderMap::new(), &with_peer("203.0.113.5:51000"), false);
        assert_eq!(identity, "203.0.113.5");
    }

    #[test]
    fn test_mapped_ipv6_is_canonical() {
        let identity = client_identity(
            &HeaderMap::new(),
            &with_peer("[::ffff:198.51.100.7]:443"),
            false,
        );
        assert_eq!(identity, "198.51.100.7");
    }

    #[test]
    fn test_forwarded_header_only_when_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("192.0.2.44, 10.0.0.1"),
        );
        let peer = with_peer("10.0.0.1:8080");

        assert_eq!(client_identity(&headers, &peer, true), "192.0.2.44");
        assert_eq!(client_identity(&headers, &peer, false), "10.0.0.1");
    }

    #[test]
    fn test_unknown_without_peer() {
        assert_eq!(
            client_identity(&HeaderMap::new(), &Extensions::new(), true),
            UNKNOWN_IDENTITY
        );
    }
}
