//! Minimal HTTP service scaffold.
//!
//! Versioned API routes, a status history endpoint, fault recovery and a
//! graceful, deadline-bounded shutdown on SIGINT.

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::ServerConfig;
pub use health::StatusReporter;
pub use lifecycle::{launch, DrainOutcome, LifecycleController, LifecycleState, Shutdown};
