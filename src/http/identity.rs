//! Caller identity extraction.
//!
//! Best-effort identifiers derived from inbound headers. These are log and
//! stats attributes only; they are never persisted and never trusted for
//! authorization. Values are length-bounded before they become map keys.

use axum::http::HeaderMap;

/// Header values longer than this are cut before use as identifiers.
const MAX_ID_LEN: usize = 64;

#[derive(Debug, Clone)]
pub struct CallerIdentity {
    /// First hop of `x-forwarded-for`, or `"unknown"`.
    pub caller_id: String,
    /// `x-ms-correlation-id`, when present.
    pub correlation_id: Option<String>,
    /// `x-ms-client-request-id`, when present.
    pub client_request_id: Option<String>,
}

impl CallerIdentity {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let caller_id = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(bound)
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            caller_id,
            correlation_id: bounded_header(headers, "x-ms-correlation-id"),
            client_request_id: bounded_header(headers, "x-ms-client-request-id"),
        }
    }
}

fn bounded_header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(bound)
}

fn bound(value: &str) -> String {
    value.chars().take(MAX_ID_LEN).collect()
}
