//! Build-side hooks for booksearch.
//!
//! A [`BuildSession`](session::BuildSession) owns the page accumulator for
//! one build: the host calls it through [`BuildHooks`](session::BuildHooks)
//! once at build start, once per page, and once at the end, when the
//! accumulated pages are exported as the search artifact.

pub mod export;
pub mod session;

pub use export::{ExportReport, copy_assets, export};
pub use session::{BuildHooks, BuildSession};
