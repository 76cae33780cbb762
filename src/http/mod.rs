//! HTTP surface subsystem.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → middleware.rs (request id, caller identity, timeout, stats on completion)
//!     → security::auth (API-key gate)
//!     → server.rs router
//!         → /api/...  stateless collaborators
//!         → /mcp      protocol gateway (session state machine)
//!         → /health, /stats operator surface
//! ```

pub mod identity;
pub mod middleware;
pub mod server;

pub use identity::CallerIdentity;
pub use server::HttpServer;
