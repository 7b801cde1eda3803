//! Per-request spans.
//!
//! The span carries the `x-request-id` set by `SetRequestIdLayer`, so every
//! event logged while handling a request can be correlated.

use axum::body::Body;
use axum::http::Request;
use tracing::Span;

pub const X_REQUEST_ID: &str = "x-request-id";

/// `make_span_with` callback for `TraceLayer`.
pub fn request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    )
}
