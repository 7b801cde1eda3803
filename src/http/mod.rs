//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, catch-all handler)
//!     → request.rs (method narrowing, path validation, target URL)
//!     → gateway (upstream call, status mapping)
//!     → response.rs (HTML rewrite or raw passthrough)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{ProxyMethod, ProxyRequest};
pub use response::{Payload, ProxiedResponse};
pub use server::{AppState, HttpServer, ServerError};
