//! API-key gate and shared-secret comparison.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::GatewayError;
use crate::http::server::AppState;

/// Compare two byte strings without early exit (no partial-match timing
/// signal). Length mismatch still returns early; key lengths are not secret.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Extract a secret offered by the caller: header first, query fallback.
pub fn offered_secret(headers: &HeaderMap, query: Option<&str>, header_name: &str, param: &str) -> String {
    if let Some(value) = headers.get(header_name).and_then(|v| v.to_str().ok()) {
        if !value.is_empty() {
            return value.to_string();
        }
    }
    query
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .find(|(k, _)| k == param)
                .map(|(_, v)| v.into_owned())
                .unwrap_or_default()
        })
        .unwrap_or_default()
}

/// API-key middleware: every route except `/health` requires the configured
/// key via the `api-key` header or `api_key` query parameter. An empty
/// configured key disables the gate.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let expected = &state.config.auth.proxy_api_key;
    if expected.is_empty() {
        return next.run(request).await;
    }

    let offered = offered_secret(request.headers(), request.uri().query(), "api-key", "api_key");
    if !constant_time_eq(offered.as_bytes(), expected.as_bytes()) {
        return GatewayError::Unauthorized.into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn equal_inputs_match() {
        assert!(constant_time_eq(b"tajny-klic", b"tajny-klic"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn different_inputs_do_not_match() {
        assert!(!constant_time_eq(b"tajny-klic", b"tajny-klid"));
        assert!(!constant_time_eq(b"kratky", b"mnohem-delsi-klic"));
        assert!(!constant_time_eq(b"a", b""));
    }

    #[test]
    fn header_wins_over_query() {
        let mut headers = HeaderMap::new();
        headers.insert("api-key", HeaderValue::from_static("from-header"));
        let secret = offered_secret(&headers, Some("api_key=from-query"), "api-key", "api_key");
        assert_eq!(secret, "from-header");
    }

    #[test]
    fn query_is_the_fallback() {
        let headers = HeaderMap::new();
        let secret = offered_secret(&headers, Some("x=1&api_key=from-query"), "api-key", "api_key");
        assert_eq!(secret, "from-query");
    }

    #[test]
    fn absent_secret_is_empty() {
        let headers = HeaderMap::new();
        assert_eq!(offered_secret(&headers, None, "api-key", "api_key"), "");
        assert_eq!(offered_secret(&headers, Some("other=1"), "api-key", "api_key"), "");
    }
}
