//! Stateful protocol surface.
//!
//! # Data Flow
//! ```text
//! POST /mcp (+ optional mcp-session-id header)
//!     → gateway.rs state machine:
//!         no header        → create session, return id in response header
//!         known id         → touch + deliver to the session handle
//!         unknown id       → 404, caller must re-initialize
//! DELETE /mcp (+ id header)
//!     → terminate; later messages with that id hit the unknown branch
//! ```

pub mod gateway;

pub use gateway::SESSION_HEADER;
