//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid, sizes > 0)
//! - Check URL shape of the upstream and public base URLs
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// Longest accepted upstream timeout in seconds.
pub const MAX_TIMEOUT_SECS: f64 = 300.0;

/// Accepted log level spellings. `warning` and `critical` are kept for
/// operators used to syslog-style levels.
pub const LOG_LEVELS: &[&str] = &[
    "trace", "debug", "info", "warn", "warning", "error", "critical",
];

/// Accepted log output formats.
pub const LOG_FORMATS: &[&str] = &["pretty", "json"];

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} must start with http:// or https:// (got '{value}')")]
    UnsupportedScheme { field: &'static str, value: String },

    #[error("{field} is not a valid URL with a host: '{value}'")]
    InvalidUrl { field: &'static str, value: String },

    #[error("{field} must be > 0 and <= {max} (got {value})")]
    OutOfRange { field: &'static str, value: f64, max: f64 },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("log_level must be one of trace, debug, info, warn, error (got '{0}')")]
    LogLevel(String),

    #[error("log_format must be pretty or json (got '{0}')")]
    LogFormat(String),

    #[error("metrics_address is not a socket address: '{0}'")]
    MetricsAddress(String),
}

/// Check a normalized configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_base_url("upstream.base_url", &config.upstream.base_url, &mut errors);
    if let Some(public_url) = &config.listener.public_url {
        check_base_url("listener.public_url", public_url, &mut errors);
    }

    check_seconds("upstream.timeout_secs", config.upstream.timeout_secs, &mut errors);
    check_seconds(
        "upstream.connect_timeout_secs",
        config.upstream.connect_timeout_secs,
        &mut errors,
    );

    if config.listener.port == 0 {
        errors.push(ValidationError::Zero { field: "listener.port" });
    }
    if config.limits.max_body_size == 0 {
        errors.push(ValidationError::Zero { field: "limits.max_body_size" });
    }
    if config.limits.max_path_length == 0 {
        errors.push(ValidationError::Zero { field: "limits.max_path_length" });
    }

    let observability = &config.observability;
    if !LOG_LEVELS.contains(&observability.log_level.as_str()) {
        errors.push(ValidationError::LogLevel(observability.log_level.clone()));
    }
    if !LOG_FORMATS.contains(&observability.log_format.as_str()) {
        errors.push(ValidationError::LogFormat(observability.log_format.clone()));
    }
    if observability.metrics_enabled
        && observability.metrics_address.parse::<std::net::SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(observability.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_base_url(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if !(value.starts_with("http://") || value.starts_with("https://")) {
        errors.push(ValidationError::UnsupportedScheme {
            field,
            value: value.to_string(),
        });
        return;
    }
    match Url::parse(value) {
        Ok(url) if url.host_str().is_some_and(|host| !host.is_empty()) => {}
        _ => errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
        }),
    }
}

fn check_seconds(field: &'static str, value: f64, errors: &mut Vec<ValidationError>) {
    if !value.is_finite() || value <= 0.0 || value > MAX_TIMEOUT_SECS {
        errors.push(ValidationError::OutOfRange {
            field,
            value,
            max: MAX_TIMEOUT_SECS,
        });
    }
}
