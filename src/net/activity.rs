//! Per-connection request activity.
//!
//! The idle deadline only applies between requests: while a connection has
//! a request in flight its stream keeps restarting the idle clock instead of
//! timing out.

use axum::{extract::ConnectInfo, extract::Request, middleware::Next, response::Response};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::net::listener::ConnectionInfo;

/// Number of requests a connection is currently handling.
#[derive(Debug, Clone, Default)]
pub struct RequestActivity(Arc<AtomicUsize>);

impl RequestActivity {
    /// Mark a request as in flight until the returned guard drops.
    pub fn begin(&self) -> InFlight {
        self.0.fetch_add(1, Ordering::SeqCst);
        InFlight(Arc::clone(&self.0))
    }

    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::SeqCst) > 0
    }
}

/// A request in flight on its connection.
#[derive(Debug)]
pub struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Holds the connection busy while the wrapped service handles the request.
pub async fn mark_in_flight(request: Request, next: Next) -> Response {
    let _in_flight = request
        .extensions()
        .get::<ConnectInfo<ConnectionInfo>>()
        .map(|ConnectInfo(info)| info.activity.begin());

    next.run(request).await
}
