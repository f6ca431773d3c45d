//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route registration (at startup):
//!     RouteTable::group("/api").group("/v1").route(GET, "/", handler)
//!     → table.rs (join prefixes, reject duplicates)
//!     → into_router() compiles an immutable axum Router
//!
//! Incoming Request (method, path)
//!     → most specific path match
//!     → method match, else 405
//!     → no path match → fallback (404)
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Duplicate (method, path) pairs are a startup error, never last-wins
//! - Explicit fallback rather than silent default

pub mod table;

pub use table::{RouteError, RouteGroup, RouteMethod, RouteTable};
