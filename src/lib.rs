//! HTML-rewriting forward proxy for a single upstream origin.

pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod rewrite;
pub mod upstream;

pub use config::schema::ProxyConfig;
pub use error::ProxyError;
pub use gateway::Gateway;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
