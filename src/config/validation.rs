//! Configuration validation.
//!
//! Semantic checks over an already-parsed [`GatewayConfig`]. Runs before the
//! config is accepted into the system; all violations are reported at once,
//! not just the first.

use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic violation, pointing at the offending field.
#[derive(Debug)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration. Pure function: returns all errors found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.trim().is_empty() {
        errors.push(ValidationError {
            field: "listener.bind_address",
            message: "must not be empty".to_string(),
        });
    }

    match Url::parse(&config.upstream.endpoint) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError {
            field: "upstream.endpoint",
            message: format!("unsupported scheme {:?}", url.scheme()),
        }),
        Err(e) => errors.push(ValidationError {
            field: "upstream.endpoint",
            message: format!("not a valid URL: {}", e),
        }),
    }

    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError {
            field: "rate_limit.max_requests",
            message: "must be at least 1".to_string(),
        });
    }
    if config.rate_limit.window_ms == 0 {
        errors.push(ValidationError {
            field: "rate_limit.window_ms",
            message: "must be at least 1".to_string(),
        });
    }

    for (field, value) in [
        ("sessions.idle_timeout_secs", config.sessions.idle_timeout_secs),
        ("sessions.sweep_interval_secs", config.sessions.sweep_interval_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("timeouts.shutdown_grace_secs", config.timeouts.shutdown_grace_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError {
                field,
                message: "must be at least 1 second".to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
