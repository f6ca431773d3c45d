//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, transient accept errors absorbed)
//!     → connection.rs (tracked for the drain, idle deadline armed)
//!     → Hand off to axum::serve
//!     → activity.rs (connection marked busy while a request is handled)
//!
//! Connection States:
//!     Busy ⇄ Idle → (idle timeout | peer close | forced close) → Closed
//! ```
//!
//! # Design Decisions
//! - Every connection holds a guard, so the open count is exact at drain time
//! - Forced close is a broadcast; each connection aborts its own I/O

pub mod activity;
pub mod connection;
pub mod listener;

pub use activity::{mark_in_flight, RequestActivity};
pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{ConnectionInfo, ListenerError, TrackedListener, TrackedStream};
