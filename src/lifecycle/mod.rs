//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → metrics → bind listener → open upstream → serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → stop accepting → drain requests → close upstream → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The listener starts last, after the upstream client exists

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
