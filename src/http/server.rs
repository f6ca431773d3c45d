//! HTTP application setup.
//!
//! # Responsibilities
//! - Register the service's routes under their versioned prefixes
//! - Wire up middleware (request id, access log, timeouts, fault recovery)
//!
//! # Design Decisions
//! - Route table is built once; a conflicting registration fails startup
//! - Middleware order is fixed: the access log sits outside fault recovery

use axum::{
    body::Body,
    extract::FromRef,
    http::{Method, Request},
    middleware, Router,
};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::{RequestBodyTimeoutLayer, TimeoutBody, TimeoutLayer},
};

use crate::config::ServerConfig;
use crate::health::StatusReporter;
use crate::http::handlers;
use crate::http::middleware::{access_log, recover_faults};
use crate::http::request::RequestIdGenerator;
use crate::routing::{RouteError, RouteMethod, RouteTable};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub status: StatusReporter,
}

impl FromRef<AppState> for StatusReporter {
    fn from_ref(state: &AppState) -> Self {
        state.status.clone()
    }
}

/// Build the route table for the service.
pub fn route_table() -> Result<RouteTable<AppState>, RouteError> {
    let mut table: RouteTable<AppState> = RouteTable::new();
    {
        let mut api = table.group("/api");

        api.group("/v1")
            .route(Method::GET, "/health/full", handlers::health_full)?
            .route(Method::GET, "/", handlers::hello)?;

        api.group("/v2").route(RouteMethod::Any, "/", handlers::fault)?;
    }
    table.fallback(handlers::not_found);
    Ok(table)
}

/// Build the complete axum application with all middleware layers.
pub fn build_router(config: &ServerConfig, status: StatusReporter) -> Result<Router, RouteError> {
    let table = route_table()?;
    tracing::info!(routes = table.routes().len(), "Routes registered");

    let router = table.into_router().with_state(AppState { status });
    Ok(with_middleware(router, config))
}

/// Wrap `router` in the service's middleware stack.
///
/// A handler running past the write timeout is answered with 408; a request
/// body stalling past the read timeout fails the body read.
#[allow(deprecated)]
pub(crate) fn with_middleware(router: Router, config: &ServerConfig) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(RequestIdGenerator))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(access_log())
        .layer(RequestBodyTimeoutLayer::new(config.read_timeout))
        .map_request(|request: Request<TimeoutBody<Body>>| request.map(Body::new))
        .layer(TimeoutLayer::new(config.write_timeout))
        .layer(middleware::from_fn(recover_faults));

    router.layer(middleware)
}
