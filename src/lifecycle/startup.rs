//! Startup orchestration.
//!
//! # Responsibilities
//! - Install the interrupt handler
//! - Build the route table and middleware stack
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal, nothing is retried
//! - Listener binds last (traffic only when ready)

use std::io;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{ConfigError, ServerConfig};
use crate::health::StatusReporter;
use crate::http::build_router;
use crate::lifecycle::controller::{LifecycleController, RunningServer};
use crate::lifecycle::signals::install_interrupt_handler;
use crate::net::ListenerError;
use crate::routing::RouteError;

/// Fatal error before the service reached `Serving`.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid route table: {0}")]
    Routes(#[from] RouteError),

    #[error("failed to install interrupt handler: {0}")]
    Signal(#[source] io::Error),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("failed to read bound address: {0}")]
    LocalAddr(#[source] io::Error),
}

/// Bring the service from a validated config to `Serving`.
pub async fn launch(
    config: Arc<ServerConfig>,
    status: StatusReporter,
) -> Result<RunningServer, StartupError> {
    let controller = LifecycleController::new(Arc::clone(&config), status.clone());

    install_interrupt_handler(controller.shutdown_handle()).map_err(StartupError::Signal)?;

    let app = build_router(&config, status)?;

    tracing::info!(
        bind_address = %config.bind_address(),
        read_timeout_ms = config.read_timeout.as_millis() as u64,
        write_timeout_ms = config.write_timeout.as_millis() as u64,
        idle_timeout_ms = config.idle_timeout.as_millis() as u64,
        shutdown_deadline_ms = config.shutdown_deadline.as_millis() as u64,
        "Starting server"
    );

    controller.start(app).await
}
