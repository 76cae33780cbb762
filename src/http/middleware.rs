//! Request-scoped middleware: timeout enforcement and completion recording.

use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::error::GatewayError;
use crate::http::identity::CallerIdentity;
use crate::http::server::AppState;
use crate::observability::stats::normalize_route;

/// Outermost request wrapper: assigns a request id, extracts caller
/// identity, and records stats + the access log line once the response is
/// ready. Runs outside the timeout layer so 504s are recorded too.
pub async fn record_request(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let identity = CallerIdentity::from_headers(request.headers());
    let request_id = Uuid::new_v4().to_string();

    let mut response = next.run(request).await;

    let duration_ms = started.elapsed().as_millis() as u64;
    let status = response.status().as_u16();
    let route = normalize_route(&path);
    state.stats.record(route, duration_ms, status, &identity.caller_id);

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        headers.insert("x-request-id", value);
    }
    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));

    tracing::info!(
        method = %method,
        path = %path,
        status,
        duration_ms,
        caller = %identity.caller_id,
        correlation_id = identity.correlation_id.as_deref(),
        client_request_id = identity.client_request_id.as_deref(),
        request_id = %request_id,
        "http_request"
    );

    response
}

/// Fixed wall-clock deadline per request.
///
/// The inner work runs as a detached task: on expiry the caller gets a 504
/// while the work finishes (or fails) on its own and its result is
/// discarded. A rate-limiter slot consumed by that work stays consumed.
pub async fn enforce_timeout(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let deadline = Duration::from_secs(state.config.timeouts.request_secs);
    let work = tokio::spawn(next.run(request));

    match tokio::time::timeout(deadline, work).await {
        Ok(Ok(response)) => response,
        Ok(Err(join_error)) => {
            GatewayError::Internal(format!("request task failed: {join_error}")).into_response()
        }
        Err(_) => GatewayError::Timeout.into_response(),
    }
}
