//! Data-lookup collaborators.
//!
//! # Data Flow
//! ```text
//! REST handler (/api/...)  ─┐
//!                           ├─→ core lookup fn → upstream::SearchClient
//! protocol tool (tools/call)┘
//! ```
//!
//! Each endpoint builds the upstream query server-side and reshapes the raw
//! search documents into compact, human-readable JSON. Callers never see the
//! upstream's filter syntax or field names.

pub mod documents;
pub mod drugs;
pub mod pharmacies;
