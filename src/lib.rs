//! SÚKL Gateway Library
//!
//! Read-only lookup gateway over the Czech drug registry, pharmacy registry
//! and SPC document indexes, exposed as a stateless REST surface and a
//! stateful session-based protocol surface, with sliding-window throttling
//! in front of the search upstream.

pub mod api;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod protocol;
pub mod security;
pub mod session;
pub mod upstream;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
