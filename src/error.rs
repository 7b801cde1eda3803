//! Client-visible error categories.
//!
//! Every variant maps to one status code and one generic message. The cause
//! is logged where the error is raised and never sent to the client.

use axum::http::header::ALLOW;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::http::request::PathRejection;
use crate::upstream::UpstreamError;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathRejection),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("request body too large")]
    PayloadTooLarge,

    #[error("failed to read request body")]
    BadRequestBody,

    #[error("upstream client not initialized")]
    Unavailable,

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidPath(_) | ProxyError::BadRequestBody => StatusCode::BAD_REQUEST,
            ProxyError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::Upstream(UpstreamError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Upstream(UpstreamError::Build(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// The message the client sees.
    pub fn detail(&self) -> &'static str {
        match self {
            ProxyError::InvalidPath(_) => "Invalid path",
            ProxyError::MethodNotAllowed => "Method Not Allowed",
            ProxyError::PayloadTooLarge => "Request body too large",
            ProxyError::BadRequestBody => "Invalid request body",
            ProxyError::Unavailable => "Service Unavailable",
            ProxyError::Upstream(e) => match e {
                UpstreamError::Timeout => "Upstream timeout",
                UpstreamError::Status(_) => "Upstream error",
                UpstreamError::Transport(_) => "Error fetching page from upstream",
                UpstreamError::TooLarge { .. } => "Response too large",
                UpstreamError::Build(_) => "Service Unavailable",
            },
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: &'static str,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let mut response = (
            self.status(),
            Json(ErrorBody {
                detail: self.detail(),
            }),
        )
            .into_response();
        if matches!(self, ProxyError::MethodNotAllowed) {
            response
                .headers_mut()
                .insert(ALLOW, HeaderValue::from_static("GET, POST"));
        }
        response
    }
}
