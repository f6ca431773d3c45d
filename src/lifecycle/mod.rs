//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Install SIGINT handler → Build router → Bind → Serve
//!
//! State machine (controller.rs):
//!     Initializing → Serving → Draining → Terminated
//!     Initializing → Terminated (bind failure)
//!
//! Shutdown (shutdown.rs):
//!     Trigger (SIGINT or programmatic) → "shutting down" → Stop accepting
//!     → Drain connections (bounded) → Force-close leftovers → Exit 0
//!
//! Signals (signals.rs):
//!     SIGINT → Trigger graceful shutdown (once; repeats ignored)
//!     SIGTERM/SIGQUIT → untouched, OS default
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then routes, then the listener
//! - Status is updated before the listener stops accepting
//! - Shutdown has timeout: forced close after deadline, still a clean exit

pub mod controller;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use controller::{DrainOutcome, LifecycleController, LifecycleState, RunningServer, ServeError};
pub use shutdown::Shutdown;
pub use startup::{launch, StartupError};
