//! Request middleware.
//!
//! Applied outer to inner: access logging (a `TraceLayer`), then fault
//! recovery, so the access log always sees the final status code.

pub mod access_log;
pub mod recovery;

pub use access_log::access_log;
pub use recovery::recover_faults;
