//! Gateway error taxonomy.
//!
//! Every error that can surface from a request handler is represented here
//! and converted to a JSON body with an `error` field at the response
//! boundary. Nothing in this crate is allowed to take the process down from
//! a single request's failure; fatal conditions (bind failure, exhausted
//! shutdown grace) are handled in `main`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// All request-scoped failure modes of the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Caller input is malformed. Never retried.
    #[error("{0}")]
    Validation(String),

    /// Missing or wrong API key.
    #[error("Invalid or missing API key.")]
    Unauthorized,

    /// Protocol message referenced a session id this process does not know.
    /// The caller is expected to re-initialize, not to treat this as fatal.
    #[error("session {0} not found")]
    SessionNotFound(String),

    /// Requested resource does not exist. Carries the user-facing message.
    #[error("{0}")]
    NotFound(String),

    /// Non-success response from the search upstream. Not retried here.
    #[error("upstream error ({status}): {detail}")]
    Upstream { status: u16, detail: String },

    /// Request exceeded the fixed wall-clock deadline.
    #[error("request timed out")]
    Timeout,

    /// Unexpected failure. Logged with full context at the boundary.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::SessionNotFound(_) | GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// User-facing message. Upstream details and internal context stay in the
    /// logs; callers get a stable Czech message in the original API's register.
    fn public_message(&self) -> String {
        match self {
            GatewayError::Validation(msg) | GatewayError::NotFound(msg) => msg.clone(),
            GatewayError::Unauthorized => "Invalid or missing API key.".to_string(),
            GatewayError::SessionNotFound(id) => {
                format!("Session {id} not found. Re-initialize to obtain a new session.")
            }
            GatewayError::Upstream { .. } => {
                "Dotaz na vyhledávací službu selhal, zkuste to prosím znovu.".to_string()
            }
            GatewayError::Timeout => "Zpracování požadavku vypršelo.".to_string(),
            GatewayError::Internal(_) => "Interní chyba serveru.".to_string(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match &self {
            GatewayError::Upstream { status, detail } => {
                tracing::error!(upstream_status = status, detail = %detail, "upstream_error");
            }
            GatewayError::Internal(detail) => {
                tracing::error!(detail = %detail, "internal_error");
            }
            _ => {}
        }
        (
            self.status_code(),
            Json(json!({ "error": self.public_message() })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            GatewayError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::Unauthorized.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            GatewayError::SessionNotFound("s".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::Upstream {
                status: 503,
                detail: "busy".into()
            }
            .status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(GatewayError::Timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            GatewayError::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn upstream_detail_stays_out_of_the_body() {
        let err = GatewayError::Upstream {
            status: 500,
            detail: "secret internal trace".into(),
        };
        assert!(!err.public_message().contains("secret"));
    }
}
