//! HTTP server setup and wiring.
//!
//! # Responsibilities
//! - Build the Axum router with both surfaces and the operator endpoints
//! - Wire up middleware (trace, stats recording, API-key gate, timeout)
//! - Own the shared state (upstream client, session registry, stats table)
//! - Run the idle-session sweeper alongside the listener
//! - Serve with graceful shutdown and drain sessions afterwards

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{RawQuery, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::http::middleware::{enforce_timeout, record_request};
use crate::lifecycle::Shutdown;
use crate::observability::stats::StatsAggregator;
use crate::protocol;
use crate::security::auth::{constant_time_eq, offered_secret, require_api_key};
use crate::session::{sweeper, SessionRegistry};
use crate::upstream::{RateLimiter, SearchClient};

/// Application state injected into handlers.
///
/// All registries are explicitly owned here, never ambient globals, so tests
/// can run multiple independent gateway instances in one process.
#[derive(Clone)]
pub struct AppState {
    pub search: Arc<SearchClient>,
    pub sessions: Arc<SessionRegistry>,
    pub stats: Arc<StatsAggregator>,
    pub config: Arc<GatewayConfig>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    state: AppState,
}

impl HttpServer {
    /// Create a new server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let limiter = RateLimiter::new(
            config.rate_limit.max_requests,
            Duration::from_millis(config.rate_limit.window_ms),
        );
        let search = Arc::new(SearchClient::new(&config.upstream, limiter)?);
        let sessions = Arc::new(SessionRegistry::new(
            Duration::from_secs(config.sessions.idle_timeout_secs),
            search.clone(),
        ));

        Ok(Self {
            state: AppState {
                search,
                sessions,
                stats: Arc::new(StatsAggregator::new()),
                config: Arc::new(config),
            },
        })
    }

    /// Shared state handle, mainly for tests inspecting registries.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    fn build_router(&self) -> Router {
        let state = self.state.clone();
        Router::new()
            .route("/health", get(health))
            .route("/stats", get(stats_snapshot))
            .route("/api/drugs/search", get(api::drugs::search))
            .route("/api/drugs/{kod}", get(api::drugs::detail))
            .route("/api/documents/search", get(api::documents::search))
            .route("/api/pharmacies/search", get(api::pharmacies::search))
            .route("/api/pharmacies/{kod}", get(api::pharmacies::detail))
            .route(
                "/mcp",
                post(protocol::gateway::handle_message).delete(protocol::gateway::terminate_session),
            )
            .with_state(state.clone())
            // Layers wrap bottom-up: timeout innermost, trace outermost.
            .layer(middleware::from_fn_with_state(state.clone(), enforce_timeout))
            .layer(middleware::from_fn_with_state(state.clone(), require_api_key))
            .layer(middleware::from_fn_with_state(state, record_request))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until the shutdown signal fires, then drain sessions.
    pub async fn run(self, listener: TcpListener, shutdown: Arc<Shutdown>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let sweeper_task = sweeper::spawn(
            self.state.sessions.clone(),
            Duration::from_secs(self.state.config.sessions.sweep_interval_secs),
            shutdown.subscribe(),
        );

        let app = self.build_router();
        let mut rx = shutdown.subscribe();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.recv().await;
                tracing::info!("stopping listener");
            })
            .await?;

        // Listener is closed; reclaim everything before reporting done.
        self.state.sessions.terminate_all();
        let _ = sweeper_task.await;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Liveness probe. Static, never gated.
async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "server": "sukl-gateway",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Operator stats snapshot, gated by the shared stats secret.
///
/// Traffic patterns (which routes, which callers, how often) are themselves
/// sensitive, so an unconfigured secret disables the endpoint entirely.
async fn stats_snapshot(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    let secret = &state.config.auth.stats_secret;
    if secret.is_empty() {
        return GatewayError::NotFound("Statistiky nejsou k dispozici.".to_string()).into_response();
    }

    let offered = offered_secret(&headers, query.as_deref(), "x-stats-key", "stats_key");
    if !constant_time_eq(offered.as_bytes(), secret.as_bytes()) {
        return GatewayError::Unauthorized.into_response();
    }

    Json(state.stats.snapshot()).into_response()
}
