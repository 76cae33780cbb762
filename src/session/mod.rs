//! Protocol session subsystem.
//!
//! # Data Flow
//! ```text
//! protocol message (+ optional session id header)
//!     → registry.rs (resolve id → handle, refresh last-activity)
//!     → handle.rs (per-session lock, JSON-RPC method dispatch)
//!     → api collaborators → upstream
//!
//! timer (sweeper.rs)
//!     → registry.sweep(now) reclaims sessions idle past the threshold
//! ```
//!
//! # Design Decisions
//! - One handle owns a given session id at a time; ids are never reused
//! - An unknown id is an error for the caller to re-initialize on, never
//!   silently resurrected as a fresh session
//! - Close is best-effort; registry bookkeeping always completes

pub mod handle;
pub mod registry;
pub mod sweeper;

pub use handle::ProtocolSession;
pub use registry::SessionRegistry;
