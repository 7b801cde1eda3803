//! Forwarding gateway: the per-request policy between client and origin.
//!
//! ```text
//! ProxyRequest
//!     → preflight: pool snapshot (503 if closed), validate_path (400)
//!     → forward: body size guard (413, POST only)
//!     → build_target_url
//!     → UpstreamClient::fetch (502 / 504)
//!     → Payload::{Html, Raw}
//!     → rewrite (HTML only, never fails)
//! ```

use std::sync::Arc;

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::http::request::{build_target_url, validate_path, ProxyMethod, ProxyRequest};
use crate::http::response::ProxiedResponse;
use crate::observability::metrics;
use crate::upstream::{UpstreamClient, UpstreamPool};

/// Validates, forwards and classifies requests for one upstream origin.
#[derive(Debug, Clone)]
pub struct Gateway {
    upstream: Arc<UpstreamPool>,
    upstream_base: Arc<str>,
    max_body_size: usize,
    max_path_length: usize,
}

impl Gateway {
    pub fn new(config: &ProxyConfig, upstream: Arc<UpstreamPool>) -> Self {
        Self {
            upstream,
            upstream_base: Arc::from(config.upstream.base_url.as_str()),
            max_body_size: config.limits.max_body_size,
            max_path_length: config.limits.max_path_length,
        }
    }

    /// Checks that need only the request line: an open pool (503) and a
    /// valid path (400). Runs before any request body is read.
    pub fn preflight(&self, path: &str) -> Result<Arc<UpstreamClient>, ProxyError> {
        let Some(client) = self.upstream.get() else {
            tracing::error!("Upstream client not initialized");
            return Err(ProxyError::Unavailable);
        };

        if let Err(rejection) = validate_path(path, self.max_path_length) {
            tracing::warn!(path = %truncate(path), error = %rejection, "Invalid path");
            return Err(rejection.into());
        }
        Ok(client)
    }

    /// Body guard, upstream call and rewrite for a request that already
    /// passed [`Gateway::preflight`].
    ///
    /// `proxy_base` is the externally visible base URL of this proxy, used to
    /// re-point links in HTML responses.
    pub async fn forward(
        &self,
        client: &UpstreamClient,
        request: ProxyRequest,
        proxy_base: String,
    ) -> Result<ProxiedResponse, ProxyError> {
        if request.method == ProxyMethod::Post && request.body.len() > self.max_body_size {
            tracing::warn!(
                size = request.body.len(),
                max_size = self.max_body_size,
                "Request body too large"
            );
            return Err(ProxyError::PayloadTooLarge);
        }

        let target_url = build_target_url(&self.upstream_base, &request.path, &request.query);
        tracing::debug!(
            method = request.method.as_str(),
            path = %request.path,
            target_url = %target_url,
            "Proxying request"
        );

        let upstream = client
            .fetch(request.method, &target_url, request.content_type, request.body)
            .await
            .map_err(|e| {
                tracing::warn!(target_url = %target_url, error = %e, "Upstream request failed");
                metrics::record_upstream_error(e.kind());
                ProxyError::from(e)
            })?;

        Ok(ProxiedResponse::from_upstream(upstream)
            .rewrite(proxy_base, Arc::clone(&self.upstream_base))
            .await)
    }
}

/// Keep rejected paths from flooding the log.
fn truncate(path: &str) -> &str {
    match path.char_indices().nth(256) {
        Some((idx, _)) => &path[..idx],
        None => path,
    }
}
