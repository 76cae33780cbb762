//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! completed request
//!     → stats.rs (normalized-route counters, duration aggregates)
//!     → /stats snapshot endpoint (secret-gated)
//!
//! process start
//!     → logging.rs (tracing subscriber, JSON or pretty)
//! ```
//!
//! # Design Decisions
//! - Stats keys are normalized routes, so cardinality is bounded by the
//!   declared route set, not by traffic
//! - Snapshots are defensive copies; live state never escapes

pub mod logging;
pub mod stats;

pub use stats::StatsAggregator;
