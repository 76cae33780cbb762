//! SÚKL Gateway
//!
//! A read-only lookup gateway over the SÚKL drug registry, pharmacy registry
//! and SPC document indexes, built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────────┐
//!                       │                   SUKL GATEWAY                    │
//!                       │                                                   │
//!   Client Request      │  ┌──────────┐   ┌───────────┐   ┌─────────────┐  │
//!   ────────────────────┼─▶│  http    │──▶│ security  │──▶│  dispatch   │  │
//!                       │  │ server   │   │ api-key   │   │             │  │
//!                       │  └──────────┘   └───────────┘   └──────┬──────┘  │
//!                       │                                        │         │
//!                       │            stateless /api/...          │ /mcp    │
//!                       │                 ▼                      ▼         │
//!                       │        ┌──────────────┐       ┌──────────────┐   │
//!                       │        │     api      │       │   session    │   │
//!                       │        │ collaborators│       │   registry   │   │
//!                       │        └──────┬───────┘       └──────┬───────┘   │
//!                       │               │                      │           │
//!                       │               ▼                      ▼           │
//!                       │        ┌─────────────────────────────────────┐   │
//!                       │        │  upstream (rate-limited client)     │───┼──── Search
//!                       │        └─────────────────────────────────────┘   │     Service
//!                       │                                                   │
//!                       │  ┌─────────────────────────────────────────────┐ │
//!                       │  │            Cross-Cutting Concerns            │ │
//!                       │  │  ┌────────┐ ┌───────────────┐ ┌───────────┐  │ │
//!                       │  │  │ config │ │ observability │ │ lifecycle │  │ │
//!                       │  │  └────────┘ └───────────────┘ └───────────┘  │ │
//!                       │  └─────────────────────────────────────────────┘ │
//!                       └──────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use sukl_gateway::lifecycle::signals;
use sukl_gateway::observability::logging;
use sukl_gateway::{config, HttpServer, Shutdown};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let config = config::from_env()?;
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.endpoint,
        rate_limit = config.rate_limit.max_requests,
        rate_window_ms = config.rate_limit.window_ms,
        session_idle_secs = config.sessions.idle_timeout_secs,
        request_timeout_secs = config.timeouts.request_secs,
        version = env!("CARGO_PKG_VERSION"),
        "configuration loaded"
    );

    let grace = Duration::from_secs(config.timeouts.shutdown_grace_secs);

    // Failure to bind is fatal; nothing else should be.
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    let server = HttpServer::new(config)?;

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        signals::wait().await;
        signal_shutdown.trigger();
    });

    let mut server_task = tokio::spawn(server.run(listener, shutdown.clone()));
    let mut rx = shutdown.subscribe();

    tokio::select! {
        result = &mut server_task => {
            result??;
        }
        _ = rx.recv() => {
            match tokio::time::timeout(grace, &mut server_task).await {
                Ok(result) => result??,
                Err(_) => {
                    tracing::error!(grace_secs = grace.as_secs(), "shutdown grace period exhausted, forcing exit");
                    std::process::exit(1);
                }
            }
        }
    }

    tracing::info!("shutdown complete");
    Ok(())
}
