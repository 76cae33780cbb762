//! Search upstream subsystem.
//!
//! # Data Flow
//! ```text
//! collaborator (REST handler or protocol tool)
//!     → client.rs (builds the search request)
//!     → rate_limit.rs (sliding-window admission, may suspend)
//!     → HTTP call to the search service
//!     → JSON result back to the collaborator
//! ```
//!
//! # Design Decisions
//! - Admission is throttling, never rejection: callers wait, they don't fail
//! - Admission timestamps are recorded before the call goes out, so in-flight
//!   calls count against the window
//! - No retry loop here; retry policy belongs to collaborators

pub mod client;
pub mod rate_limit;

pub use client::{HybridQuery, SearchClient, SearchQuery};
pub use rate_limit::RateLimiter;
