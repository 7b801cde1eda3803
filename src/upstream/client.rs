//! HTTP client for the single upstream origin.
//!
//! # Responsibilities
//! - Keep a pool of keep-alive connections to the origin
//! - Issue one GET or POST per inbound request (no retries)
//! - Enforce the whole-call timeout and the response size limit
//! - Classify failures so the gateway can pick a status code

use axum::body::Bytes;
use axum::http::{HeaderValue, StatusCode};
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;

use crate::config::{LimitsConfig, UpstreamConfig};
use crate::http::request::ProxyMethod;

/// Failure talking to the upstream origin.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Connect plus read exceeded the configured timeout.
    #[error("upstream timed out")]
    Timeout,

    /// The origin answered with a non-2xx status.
    #[error("upstream returned {0}")]
    Status(StatusCode),

    /// DNS, refused connection, TLS or protocol failure.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Response body exceeds the configured maximum.
    #[error("response of {size} bytes exceeds limit of {max}")]
    TooLarge { size: u64, max: usize },

    /// The client could not be constructed.
    #[error("failed to build upstream client: {0}")]
    Build(#[source] reqwest::Error),
}

impl UpstreamError {
    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(e)
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Status(_) => "status",
            Self::Transport(_) => "transport",
            Self::TooLarge { .. } => "too_large",
            Self::Build(_) => "build",
        }
    }
}

/// A fully buffered, size-checked upstream response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

/// Pooled client bound to one origin.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    inner: reqwest::Client,
    max_body_size: usize,
}

impl UpstreamClient {
    /// Build the pooled client. Redirects are followed (reqwest default
    /// policy, up to 10 hops).
    pub fn new(config: &UpstreamConfig, limits: &LimitsConfig) -> Result<Self, UpstreamError> {
        let inner = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .pool_max_idle_per_host(config.max_idle_per_host)
            .pool_idle_timeout(config.idle_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(UpstreamError::Build)?;

        Ok(Self {
            inner,
            max_body_size: limits.max_body_size,
        })
    }

    /// Send one request and buffer the response.
    ///
    /// `content_type` is forwarded on POST so form submissions keep their
    /// encoding.
    pub async fn fetch(
        &self,
        method: ProxyMethod,
        target_url: &str,
        content_type: Option<HeaderValue>,
        body: Bytes,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let request = match method {
            ProxyMethod::Get => self.inner.get(target_url),
            ProxyMethod::Post => {
                let request = self.inner.post(target_url).body(body);
                match content_type {
                    Some(value) => request.header(CONTENT_TYPE, value),
                    None => request,
                }
            }
        };

        let mut response = request.send().await.map_err(UpstreamError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status));
        }

        if let Some(size) = response.content_length() {
            if size > self.max_body_size as u64 {
                return Err(UpstreamError::TooLarge {
                    size,
                    max: self.max_body_size,
                });
            }
        }

        let content_type = response.headers().get(CONTENT_TYPE).cloned();

        // Stop reading as soon as the limit is crossed rather than holding
        // an arbitrarily large body in memory.
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(UpstreamError::from_reqwest)? {
            let size = body.len() + chunk.len();
            if size > self.max_body_size {
                return Err(UpstreamError::TooLarge {
                    size: size as u64,
                    max: self.max_body_size,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(UpstreamResponse {
            status,
            content_type,
            body: Bytes::from(body),
        })
    }
}
