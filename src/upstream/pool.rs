//! Lifecycle holder for the shared upstream client.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::config::ProxyConfig;
use crate::upstream::client::{UpstreamClient, UpstreamError};

/// The process-wide upstream client slot.
///
/// Created empty, opened before the listener starts serving and closed after
/// the server has drained. Handlers take a cheap `Arc` snapshot per request,
/// so closing never interrupts a call already in flight; a request arriving
/// while the slot is empty is answered with 503.
#[derive(Debug, Default)]
pub struct UpstreamPool {
    client: ArcSwapOption<UpstreamClient>,
}

impl UpstreamPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the client and make it available to handlers.
    pub fn open(&self, config: &ProxyConfig) -> Result<(), UpstreamError> {
        let client = UpstreamClient::new(&config.upstream, &config.limits)?;
        self.client.store(Some(Arc::new(client)));
        tracing::info!(
            upstream = %config.upstream.base_url,
            max_idle_per_host = config.upstream.max_idle_per_host,
            timeout_secs = config.upstream.timeout_secs,
            "Upstream client opened"
        );
        Ok(())
    }

    /// Release the client. Idle pooled connections close once the last
    /// in-flight snapshot is dropped.
    pub fn close(&self) {
        if self.client.swap(None).is_some() {
            tracing::info!("Upstream client closed");
        }
    }

    /// The current client, if open.
    pub fn get(&self) -> Option<Arc<UpstreamClient>> {
        self.client.load_full()
    }

    pub fn is_open(&self) -> bool {
        self.client.load().is_some()
    }
}
