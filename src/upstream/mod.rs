//! Upstream origin subsystem.
//!
//! # Data Flow
//! ```text
//! main → UpstreamPool::open (before serving)
//!     → handler takes Arc<UpstreamClient> snapshot
//!     → client.rs (single request, timeout, size limit)
//!     → UpstreamResponse | UpstreamError
//! server drained → UpstreamPool::close
//! ```
//!
//! # Design Decisions
//! - One origin, one client, created once and injected through router state
//! - No retries, no backoff: the first failure is the answer
//! - Bodies are fully buffered; the size limit is enforced while reading

pub mod client;
pub mod pool;

pub use client::{UpstreamClient, UpstreamError, UpstreamResponse};
pub use pool::UpstreamPool;
