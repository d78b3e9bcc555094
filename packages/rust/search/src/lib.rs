//! Search widget logic for the exported page index.
//!
//! The browser widget loads `search_pages.json`, builds an in-memory index
//! over page titles and content, and answers debounced incremental queries.
//! This crate holds everything but the DOM wiring:
//! - [`ArtifactSource`]: fetching the artifact over HTTP or from disk
//! - [`SearchIndex`]: the inverted index and per-field ranking
//! - [`SearchWidget`]: the load/query state machine and its [`Debouncer`]
//! - [`render`]: result markup, highlighting and relative links

mod index;
pub mod render;
mod source;
mod widget;

pub use index::{Field, FieldResult, Hit, SearchIndex, Tokenize, flatten_results};
pub use source::{ArtifactSource, FileArtifactSource, HttpArtifactSource, artifact_url};
pub use widget::{Debouncer, Dropdown, IndexState, SearchWidget, UiSetup, WidgetState};
