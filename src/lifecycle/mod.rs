//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build subsystems → Bind listener → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Sweeper exits → Sessions drained
//!     → Exit (forced after the grace deadline)
//!
//! Signals (signals.rs):
//!     SIGTERM / Ctrl+C → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Shutdown has a hard deadline: forced exit when the grace period runs out

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
