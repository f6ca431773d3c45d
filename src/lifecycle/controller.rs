//! Lifecycle state machine.
//!
//! # States
//! - Initializing: config resolved, nothing bound yet
//! - Serving: listener bound, requests accepted
//! - Draining: no new connections, in-flight requests finishing
//! - Terminated: serve task finished or abandoned
//!
//! # State Transitions
//! ```text
//! Initializing → Serving:     listener bound, "accepting requests" recorded
//! Initializing → Terminated:  bind failure (no retry)
//! Serving → Draining:         shutdown triggered, "shutting down" recorded
//! Draining → Terminated:      all connections done, or shutdown deadline hit
//! ```
//!
//! Transitions only move forward; a request to go back is ignored.

use axum::{middleware, Router};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{oneshot, watch};
use tokio::task::{JoinError, JoinHandle};

use crate::config::ServerConfig;
use crate::health::status::{ACCEPTING_REQUESTS, SHUTTING_DOWN};
use crate::health::StatusReporter;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::startup::StartupError;
use crate::net::{mark_in_flight, ConnectionInfo, ConnectionTracker, TrackedListener};

/// Where the service is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    Initializing,
    Serving,
    Draining,
    Terminated,
}

/// How the drain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every connection finished before the deadline.
    Graceful,
    /// The deadline expired; the remaining connections were dropped.
    Forced { open_connections: u64 },
}

/// The serve task ended without being asked to.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("server stopped unexpectedly: {0}")]
    Io(#[from] io::Error),

    #[error("server task failed: {0}")]
    Task(#[from] JoinError),

    #[error("server stopped accepting connections")]
    Stopped,
}

/// Owns the listener and drives the service through its states.
pub struct LifecycleController {
    config: Arc<ServerConfig>,
    status: StatusReporter,
    shutdown: Shutdown,
    state: watch::Sender<LifecycleState>,
}

impl LifecycleController {
    pub fn new(config: Arc<ServerConfig>, status: StatusReporter) -> Self {
        let (state, _) = watch::channel(LifecycleState::Initializing);
        Self {
            config,
            status,
            shutdown: Shutdown::new(),
            state,
        }
    }

    /// Handle that starts the drain when triggered.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Bind the configured address and start serving `app`.
    pub async fn start(self, app: Router) -> Result<RunningServer, StartupError> {
        match TrackedListener::bind(&self.config).await {
            Ok(listener) => self.serve(listener, app),
            Err(e) => {
                self.advance(LifecycleState::Terminated);
                Err(e.into())
            }
        }
    }

    /// Start serving `app` on an already bound listener.
    fn serve(self, listener: TrackedListener, app: Router) -> Result<RunningServer, StartupError> {
        let local_addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(e) => {
                self.advance(LifecycleState::Terminated);
                return Err(StartupError::LocalAddr(e));
            }
        };
        let tracker = listener.tracker();
        let (drain_tx, drain_rx) = oneshot::channel::<()>();

        let app = app
            .layer(middleware::from_fn(mark_in_flight))
            .into_make_service_with_connect_info::<ConnectionInfo>();
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = drain_rx.await;
        });
        let task = tokio::spawn(async move { server.await });

        tracing::info!(address = %local_addr, "Listening to {}", local_addr);
        self.status.report(ACCEPTING_REQUESTS);
        self.advance(LifecycleState::Serving);

        Ok(RunningServer {
            controller: self,
            local_addr,
            tracker,
            drain_tx: Some(drain_tx),
            task,
        })
    }

    fn advance(&self, next: LifecycleState) {
        let moved = self.state.send_if_modified(|current| {
            if next > *current {
                *current = next;
                true
            } else {
                false
            }
        });
        if moved {
            tracing::debug!(state = ?next, "Lifecycle state changed");
        } else {
            tracing::warn!(requested = ?next, current = ?self.state(), "Ignoring backwards lifecycle transition");
        }
    }
}

/// A service in the `Serving` state.
pub struct RunningServer {
    controller: LifecycleController,
    local_addr: SocketAddr,
    tracker: ConnectionTracker,
    drain_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<io::Result<()>>,
}

impl RunningServer {
    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_handle(&self) -> Shutdown {
        self.controller.shutdown_handle()
    }

    pub fn state(&self) -> LifecycleState {
        self.controller.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.controller.subscribe()
    }

    /// Number of currently open client connections.
    pub fn open_connections(&self) -> u64 {
        self.tracker.active_count()
    }

    /// Serve until the shutdown is triggered, then drain and terminate.
    pub async fn run_until_shutdown(mut self) -> Result<DrainOutcome, ServeError> {
        let shutdown = self.controller.shutdown_handle();
        let stopped = tokio::select! {
            _ = shutdown.triggered() => None,
            joined = &mut self.task => Some(joined),
        };

        match stopped {
            None => Ok(self.drain().await),
            Some(joined) => {
                self.controller.advance(LifecycleState::Terminated);
                tracing::error!("Server stopped before shutdown was requested");
                joined??;
                Err(ServeError::Stopped)
            }
        }
    }

    async fn drain(mut self) -> DrainOutcome {
        let deadline = self.controller.config.shutdown_deadline;

        self.controller.status.report(SHUTTING_DOWN);
        self.controller.advance(LifecycleState::Draining);

        if let Some(drain_tx) = self.drain_tx.take() {
            let _ = drain_tx.send(());
        }
        tracing::info!(
            open_connections = self.tracker.active_count(),
            deadline_ms = deadline.as_millis() as u64,
            "Draining connections"
        );

        let outcome = match tokio::time::timeout(deadline, &mut self.task).await {
            Ok(joined) => {
                match joined {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::error!(error = %e, "Server error while draining"),
                    Err(e) => tracing::error!(error = %e, "Server task failed while draining"),
                }
                DrainOutcome::Graceful
            }
            Err(_) => {
                let open_connections = self.tracker.active_count();
                tracing::warn!(
                    open_connections,
                    "Shutdown deadline reached, closing remaining connections"
                );
                self.tracker.close_all();
                self.task.abort();
                DrainOutcome::Forced { open_connections }
            }
        };

        self.controller.advance(LifecycleState::Terminated);
        outcome
    }
}
