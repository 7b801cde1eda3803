//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind host and port).
    pub listener: ListenerConfig,

    /// The single upstream origin and the client used to reach it.
    pub upstream: UpstreamConfig,

    /// Request and response size limits.
    pub limits: LimitsConfig,

    /// Inbound server settings.
    pub server: ServerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ProxyConfig {
    /// Canonicalize values that have more than one accepted spelling.
    ///
    /// Trailing slashes are stripped from base URLs and the log level is
    /// lower-cased. Runs before validation.
    pub fn normalize(&mut self) {
        self.upstream.base_url = trim_base(&self.upstream.base_url);
        self.listener.public_url = self
            .listener
            .public_url
            .take()
            .map(|url| trim_base(&url))
            .filter(|url| !url.is_empty());
        self.observability.log_level = self.observability.log_level.trim().to_ascii_lowercase();
        self.observability.log_format = self.observability.log_format.trim().to_ascii_lowercase();
    }

    /// Address the listener binds to, in `host:port` form.
    pub fn bind_address(&self) -> String {
        if self.listener.host.contains(':') && !self.listener.host.starts_with('[') {
            format!("[{}]:{}", self.listener.host, self.listener.port)
        } else {
            format!("{}:{}", self.listener.host, self.listener.port)
        }
    }
}

fn trim_base(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host or IP to bind.
    pub host: String,

    /// Port to bind.
    pub port: u16,

    /// Fixed external base URL used when rewriting links.
    ///
    /// When unset the base is derived per request from the `Host` header.
    pub public_url: Option<String>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8232,
            public_url: None,
        }
    }
}

/// Upstream origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the origin, scheme and host, no trailing slash.
    pub base_url: String,

    /// Total time allowed for one upstream call (connect + read) in seconds.
    pub timeout_secs: f64,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: f64,

    /// Idle keep-alive connections kept per upstream host.
    pub max_idle_per_host: usize,

    /// Idle connections are closed after this many seconds.
    pub idle_timeout_secs: u64,

    /// User-Agent sent upstream.
    pub user_agent: String,
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.connect_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://news.ycombinator.com".to_string(),
            timeout_secs: 30.0,
            connect_timeout_secs: 10.0,
            max_idle_per_host: 32,
            idle_timeout_secs: 90,
            user_agent: concat!("hn-proxy/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Size limits applied to both directions.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request body (POST) and upstream response body in bytes.
    pub max_body_size: usize,

    /// Maximum decoded path length in characters.
    pub max_path_length: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 10 * 1024 * 1024, // 10MB
            max_path_length: 2048,
        }
    }
}

/// Inbound server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Extra seconds on top of the upstream timeout before the server
    /// abandons a request on its own.
    pub deadline_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            deadline_grace_secs: 5,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format (pretty, json).
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
