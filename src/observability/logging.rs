//! Structured logging setup.
//!
//! One JSON object per line in production (`SUKL_LOG_FORMAT=json`) so log
//! ingestion can index the fields; human-readable output otherwise. Level
//! comes from `RUST_LOG` with a sane default.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sukl_gateway=info,tower_http=warn".into());

    let json = std::env::var("SUKL_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
