//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with a single catch-all proxy handler
//! - Wire up middleware (request ID, tracing, server deadline)
//! - Own the upstream pool lifecycle: open before serving, close after drain
//! - Translate Axum requests into gateway calls

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header::CONTENT_LENGTH, HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use http_body_util::LengthLimitError;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::gateway::Gateway;
use crate::http::request::{proxy_base_url, ProxyMethod, ProxyRequest};
use crate::http::response::ProxiedResponse;
use crate::observability::{metrics, tracing::request_span};
use crate::upstream::{UpstreamError, UpstreamPool};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Gateway,
    pub public_url: Option<Arc<str>>,
    pub fallback_authority: Arc<str>,
    pub max_body_size: usize,
}

/// Failure starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to open upstream client: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    upstream: Arc<UpstreamPool>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// The upstream pool starts closed; [`HttpServer::run`] opens it.
    pub fn new(config: ProxyConfig) -> Self {
        let upstream = Arc::new(UpstreamPool::new());
        let state = AppState {
            gateway: Gateway::new(&config, Arc::clone(&upstream)),
            public_url: config.listener.public_url.as_deref().map(Arc::from),
            fallback_authority: Arc::from(config.bind_address()),
            max_body_size: config.limits.max_body_size,
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            upstream,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let deadline = config.upstream.timeout()
            + Duration::from_secs(config.server.deadline_grace_secs);

        Router::new()
            .fallback(proxy_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(request_span))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::with_status_code(StatusCode::GATEWAY_TIMEOUT, deadline)),
            )
    }

    /// A handle to the router, for serving or driving in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// The shared upstream pool.
    pub fn upstream(&self) -> &Arc<UpstreamPool> {
        &self.upstream
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Open the upstream pool, serve until `shutdown` fires, drain, then
    /// close the pool.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        self.upstream.open(&self.config)?;

        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.base_url,
            "HTTP server starting"
        );

        let served = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await;

        self.upstream.close();
        served?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all proxy handler: every path, every method.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();

    let response = match forward(&state, request).await {
        Ok(response) => response.into_response(),
        Err(e) => {
            tracing::debug!(status = %e.status(), error = %e, "Request failed");
            e.into_response()
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}

/// Method (405), then pool and path (503, 400), then the body (413).
async fn forward(state: &AppState, request: Request<Body>) -> Result<ProxiedResponse, ProxyError> {
    let method = ProxyMethod::try_from(request.method()).map_err(|method| {
        tracing::warn!(method = %method, "Method not allowed");
        ProxyError::MethodNotAllowed
    })?;

    let (parts, body) = request.into_parts();
    let client = state.gateway.preflight(parts.uri.path())?;

    let proxy_base = proxy_base_url(
        state.public_url.as_deref(),
        &parts.uri,
        &parts.headers,
        &state.fallback_authority,
    );

    let body = match method {
        ProxyMethod::Get => Bytes::new(),
        ProxyMethod::Post => read_body(&parts.headers, body, state.max_body_size).await?,
    };

    let request = ProxyRequest::new(method, &parts.uri, &parts.headers, body);
    state.gateway.forward(&client, request, proxy_base).await
}

/// Buffer a request body, refusing anything over `max` bytes.
///
/// A declared `Content-Length` over the limit is refused without reading.
async fn read_body(headers: &HeaderMap, body: Body, max: usize) -> Result<Bytes, ProxyError> {
    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared.is_some_and(|len| len > max as u64) {
        tracing::warn!(declared = ?declared, max_size = max, "Request body too large");
        return Err(ProxyError::PayloadTooLarge);
    }

    axum::body::to_bytes(body, max).await.map_err(|e| {
        let too_large = e.into_inner().downcast_ref::<LengthLimitError>().is_some();
        if too_large {
            tracing::warn!(max_size = max, "Request body too large");
            ProxyError::PayloadTooLarge
        } else {
            tracing::warn!("Failed to read request body");
            ProxyError::BadRequestBody
        }
    })
}
