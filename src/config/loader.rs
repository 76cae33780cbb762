//! Configuration loading from the environment.

use std::str::FromStr;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { var: &'static str, value: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(var) => write!(f, "required environment variable {} is not set", var),
            ConfigError::Invalid { var, value } => {
                write!(f, "environment variable {} has unparseable value {:?}", var, value)
            }
            ConfigError::Validation(errors) => {
                write!(f, "validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from process environment variables.
pub fn from_env() -> Result<GatewayConfig, ConfigError> {
    from_lookup(|var| std::env::var(var).ok())
}

/// Load configuration through an arbitrary variable lookup.
///
/// Split out from [`from_env`] so tests can supply variables without touching
/// the process environment.
pub fn from_lookup<F>(lookup: F) -> Result<GatewayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = GatewayConfig::default();

    if let Some(addr) = lookup("SUKL_LISTEN") {
        config.listener.bind_address = addr;
    }

    config.upstream.endpoint = lookup("SEARCH_ENDPOINT").ok_or(ConfigError::Missing("SEARCH_ENDPOINT"))?;
    if let Some(key) = lookup("SEARCH_API_KEY") {
        config.upstream.api_key = key;
    }

    if let Some(v) = parse_var(&lookup, "SEARCH_RATE_LIMIT")? {
        config.rate_limit.max_requests = v;
    }
    if let Some(v) = parse_var(&lookup, "SEARCH_RATE_WINDOW_MS")? {
        config.rate_limit.window_ms = v;
    }
    if let Some(v) = parse_var(&lookup, "SESSION_IDLE_SECS")? {
        config.sessions.idle_timeout_secs = v;
    }
    if let Some(v) = parse_var(&lookup, "SESSION_SWEEP_SECS")? {
        config.sessions.sweep_interval_secs = v;
    }
    if let Some(v) = parse_var(&lookup, "REQUEST_TIMEOUT_SECS")? {
        config.timeouts.request_secs = v;
    }
    if let Some(v) = parse_var(&lookup, "SHUTDOWN_GRACE_SECS")? {
        config.timeouts.shutdown_grace_secs = v;
    }

    if let Some(key) = lookup("PROXY_API_KEY") {
        config.auth.proxy_api_key = key;
    }
    if let Some(secret) = lookup("STATS_SECRET") {
        config.auth.stats_secret = secret;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn parse_var<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}
