//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits so a config can also be embedded in tests
//! or dumped for diagnostics.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Search upstream endpoint and credentials.
    pub upstream: UpstreamConfig,

    /// Sliding-window admission policy for upstream calls.
    pub rate_limit: RateLimitConfig,

    /// Protocol session lifetimes.
    pub sessions: SessionConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// API-key and stats-endpoint secrets.
    pub auth: AuthConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080"). Env: `SUKL_LISTEN`.
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Search upstream configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the search service. Env: `SEARCH_ENDPOINT` (required).
    pub endpoint: String,

    /// Query key sent as the `api-key` header. Empty means anonymous.
    /// Env: `SEARCH_API_KEY`.
    pub api_key: String,
}

/// Sliding-window rate limit for the search upstream.
///
/// The upstream quota has some slack, so the window ceiling is enforced per
/// admission decision rather than globally serialized (see
/// `upstream::rate_limit`).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum admitted calls per window, per upstream index.
    /// Env: `SEARCH_RATE_LIMIT`.
    pub max_requests: u32,

    /// Rolling window length in milliseconds. Env: `SEARCH_RATE_WINDOW_MS`.
    pub window_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 90,
            window_ms: 60_000,
        }
    }
}

/// Protocol session lifecycle settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// A session idle longer than this is reclaimed by the sweeper.
    /// Env: `SESSION_IDLE_SECS`.
    pub idle_timeout_secs: u64,

    /// How often the idle sweep runs, independent of traffic.
    /// Env: `SESSION_SWEEP_SECS`.
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 600,
            sweep_interval_secs: 60,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Wall-clock deadline for a single inbound request.
    /// Env: `REQUEST_TIMEOUT_SECS`.
    pub request_secs: u64,

    /// Hard bound on graceful shutdown before forced exit.
    /// Env: `SHUTDOWN_GRACE_SECS`.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            shutdown_grace_secs: 10,
        }
    }
}

/// Shared secrets for the caller-facing and operator surfaces.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// API key required on every route except `/health`.
    /// Empty disables the gate. Env: `PROXY_API_KEY`.
    pub proxy_api_key: String,

    /// Secret gating the `/stats` snapshot. Empty disables the endpoint.
    /// Env: `STATS_SECRET`.
    pub stats_secret: String,
}
