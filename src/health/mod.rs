//! Service health reporting.
//!
//! # Data Flow
//! ```text
//! Lifecycle controller
//!     → status.rs report("accepting requests" / "shutting down")
//!     → bounded, time-ordered history
//!
//! GET /api/v1/health/full
//!     → status.rs snapshot()
//!     → JSON array of entries
//! ```
//!
//! # Design Decisions
//! - History is a bounded ring; the oldest entry is dropped first
//! - Writers serialize on a mutex, readers get a copy taken under it
//! - Timestamps never go backwards, even if the wall clock does

pub mod status;

pub use status::{StatusEntry, StatusReporter};
