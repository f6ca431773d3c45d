//! Access logging.
//! Writes one structured line per completed request, on top of `TraceLayer`.

use axum::{
    body::HttpBody,
    http::{header, Request, Response},
};
use std::time::Duration;
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    trace::{MakeSpan, OnResponse, TraceLayer},
};
use tracing::Span;

use crate::http::request::request_id;

/// Request tracing layer used by the service.
pub type AccessLogLayer =
    TraceLayer<SharedClassifier<ServerErrorsAsFailures>, RequestSpan, (), AccessLog, (), (), ()>;

/// Access log layer. Failures are not logged separately: recovery already
/// records faults and the access line carries the status.
pub fn access_log() -> AccessLogLayer {
    TraceLayer::new_for_http()
        .make_span_with(RequestSpan)
        .on_request(())
        .on_response(AccessLog)
        .on_body_chunk(())
        .on_eos(())
        .on_failure(())
}

/// Span carrying the request id, method and path.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSpan;

impl<B> MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        tracing::info_span!(
            "request",
            request_id = %request_id(request),
            method = %request.method(),
            path = %request.uri().path(),
        )
    }
}

/// Emits the `Request completed` line.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessLog;

impl<B: HttpBody> OnResponse<B> for AccessLog {
    fn on_response(self, response: &Response<B>, latency: Duration, _span: &Span) {
        let bytes = response.body().size_hint().exact().or_else(|| {
            response
                .headers()
                .get(header::CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
        });

        tracing::info!(
            status = response.status().as_u16(),
            bytes = bytes.unwrap_or(0),
            latency_ms = latency.as_secs_f64() * 1000.0,
            "Request completed"
        );
    }
}
