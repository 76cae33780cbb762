//! Protocol message dispatch.
//!
//! Routes each inbound message through the session registry: absent id
//! creates a session, known id delivers in arrival order, unknown id is a
//! signal to re-initialize and is never resurrected as a new session.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;

use crate::error::GatewayError;
use crate::http::server::AppState;

/// Header conveying the opaque session identity.
pub const SESSION_HEADER: &str = "mcp-session-id";

fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// `POST /mcp` — deliver one JSON-RPC message to a session.
pub async fn handle_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let message: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            return GatewayError::Validation(format!("invalid JSON-RPC body: {e}")).into_response()
        }
    };

    let resolved = match state.sessions.resolve(session_id(&headers)) {
        Ok(resolved) => resolved,
        Err(err) => return err.into_response(),
    };

    let reply = resolved.session.handle_message(message).await;

    let mut response = match reply {
        Ok(Some(value)) => Json(value).into_response(),
        Ok(None) => StatusCode::ACCEPTED.into_response(),
        Err(err) => err.into_response(),
    };

    // The assigned identity rides back on every reply; on creation it is the
    // caller's only way to learn it.
    if let Ok(value) = HeaderValue::from_str(resolved.session.id()) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}

/// `DELETE /mcp` — explicit session termination, distinct from message
/// delivery.
pub async fn terminate_session(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(id) = session_id(&headers) else {
        return GatewayError::Validation(format!("missing {SESSION_HEADER} header")).into_response();
    };

    if state.sessions.terminate(id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        GatewayError::SessionNotFound(id.to_string()).into_response()
    }
}
