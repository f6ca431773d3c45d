//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (net::TrackedListener)
//!     → request.rs (x-request-id assigned and echoed back)
//!     → middleware/access_log.rs (request span, one line per completed request)
//!     → timeouts (body read, handler deadline)
//!     → middleware/recovery.rs (handler faults → 500)
//!     → routing table → handlers.rs
//!     → response.rs (JSON encoding)
//!     → Send to client
//! ```

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use error::{ApiError, HandlerFault};
pub use request::{RequestIdGenerator, X_REQUEST_ID};
pub use server::{build_router, AppState};
