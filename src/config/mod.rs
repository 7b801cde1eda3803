//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → Overrides (CLI flags / environment)
//!     → ProxyConfig::normalize (trailing slashes, case)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the upstream origin is fixed for the
//!   life of the process
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, Overrides};
pub use schema::ProxyConfig;
pub use schema::{LimitsConfig, ListenerConfig, ObservabilityConfig, ServerConfig, UpstreamConfig};
pub use validation::ValidationError;
