//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → auth.rs (API-key gate, every route except /health)
//!     → Pass to timeout + handler layers
//!
//! /stats request:
//!     → auth.rs (shared-secret check, constant-time compare)
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any check failure
//! - Secret comparisons never early-exit, so timing reveals nothing about
//!   partial matches

pub mod auth;

pub use auth::constant_time_eq;
