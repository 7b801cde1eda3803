//! HTML rewriting subsystem.
//!
//! # Data Flow
//! ```text
//! buffered upstream HTML (String)
//!     → html.rs (tokenize, attach handlers)
//!         → a[href] / form[action]  → RewriteContext::retarget
//!         → text outside script/style → trademark.rs
//!     → serialized document
//! ```
//!
//! # Design Decisions
//! - Pure and synchronous; no I/O, no shared state
//! - Total: every failure degrades to the unmodified input
//! - Per-link outcome is a value (`Some(new)` or leave alone), not an error

pub mod html;
pub mod trademark;

pub use html::{rewrite_html, RewriteContext};
pub use trademark::{add_trademark, add_trademark_to, TRADEMARK};
