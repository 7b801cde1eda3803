//! Response handling and transformation.
//!
//! # Responsibilities
//! - Decide once, from the upstream content type, whether a body is HTML
//! - Run HTML through the rewriter, falling back to the original on failure
//! - Render the client response with the upstream status preserved
//!
//! # Design Decisions
//! - `Payload` has exactly two variants and exactly two render paths
//! - Non-HTML bodies are passed through byte-for-byte with their content type
//! - A rewrite failure never becomes a client-visible error

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::observability::metrics;
use crate::rewrite::rewrite_html;
use crate::upstream::UpstreamResponse;

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Upstream body, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// `text/html`, decoded as text.
    Html(String),
    /// Anything else, untouched.
    Raw {
        bytes: Bytes,
        content_type: Option<HeaderValue>,
    },
}

impl Payload {
    /// Case-insensitive substring match on `text/html`.
    pub fn is_html(content_type: Option<&HeaderValue>) -> bool {
        content_type
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase().contains("text/html"))
            .unwrap_or(false)
    }

    pub fn classify(content_type: Option<HeaderValue>, body: Bytes) -> Self {
        if !Self::is_html(content_type.as_ref()) {
            return Payload::Raw {
                bytes: body,
                content_type,
            };
        }
        match String::from_utf8(body.to_vec()) {
            Ok(text) => Payload::Html(text),
            Err(e) => {
                tracing::warn!(error = %e, "HTML body is not valid UTF-8, decoding lossily");
                Payload::Html(String::from_utf8_lossy(&body).into_owned())
            }
        }
    }
}

/// A response ready to send: upstream status plus classified payload.
#[derive(Debug, Clone)]
pub struct ProxiedResponse {
    pub status: StatusCode,
    pub payload: Payload,
}

impl ProxiedResponse {
    pub fn from_upstream(upstream: UpstreamResponse) -> Self {
        Self {
            status: upstream.status,
            payload: Payload::classify(upstream.content_type, upstream.body),
        }
    }

    /// Rewrite an HTML payload for the proxy at `proxy_base`.
    ///
    /// The rewrite runs on the blocking pool. If it panics, the original
    /// document is kept.
    pub async fn rewrite(self, proxy_base: String, upstream_base: Arc<str>) -> Self {
        let html = match self.payload {
            Payload::Html(html) => html,
            payload => {
                return Self {
                    status: self.status,
                    payload,
                }
            }
        };

        let original: Arc<str> = Arc::from(html);
        let input = Arc::clone(&original);
        let rewritten = tokio::task::spawn_blocking(move || {
            rewrite_html(&input, Some(proxy_base.as_str()), &upstream_base)
        })
        .await;

        let html = match rewritten {
            Ok(html) => {
                metrics::record_rewrite("ok");
                html
            }
            Err(e) => {
                tracing::error!(error = %e, "HTML rewrite task failed, serving original");
                metrics::record_rewrite("fallback");
                original.to_string()
            }
        };

        Self {
            status: self.status,
            payload: Payload::Html(html),
        }
    }
}

impl IntoResponse for ProxiedResponse {
    fn into_response(self) -> Response {
        let (body, content_type) = match self.payload {
            Payload::Html(html) => (
                Body::from(html),
                Some(HeaderValue::from_static(HTML_CONTENT_TYPE)),
            ),
            Payload::Raw {
                bytes,
                content_type,
            } => (Body::from(bytes), content_type),
        };

        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        if let Some(content_type) = content_type {
            response.headers_mut().insert(CONTENT_TYPE, content_type);
        }
        response
    }
}
