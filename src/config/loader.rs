//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Values that take precedence over the config file, typically from the
/// command line or environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub upstream: Option<String>,
    pub timeout_secs: Option<f64>,
    pub max_body_size: Option<usize>,
    pub log_level: Option<String>,
    pub public_url: Option<String>,
}

impl Overrides {
    /// Write every present override into `config`.
    pub fn apply(self, config: &mut ProxyConfig) {
        if let Some(host) = self.host {
            config.listener.host = host;
        }
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(upstream) = self.upstream {
            config.upstream.base_url = upstream;
        }
        if let Some(timeout) = self.timeout_secs {
            config.upstream.timeout_secs = timeout;
        }
        if let Some(size) = self.max_body_size {
            config.limits.max_body_size = size;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
        if let Some(public_url) = self.public_url {
            config.listener.public_url = Some(public_url);
        }
    }
}

/// Parse configuration from TOML text without validating it.
pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Normalize and validate a configuration assembled from any source.
pub fn finalize(mut config: ProxyConfig) -> Result<ProxyConfig, ConfigError> {
    config.normalize();
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load configuration from an optional TOML file, apply overrides, then
/// normalize and validate.
///
/// A missing `path` means defaults only.
pub fn load_config(path: Option<&Path>, overrides: Overrides) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config(&fs::read_to_string(path)?)?,
        None => ProxyConfig::default(),
    };
    overrides.apply(&mut config);
    finalize(config)
}
