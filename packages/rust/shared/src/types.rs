//! Core domain types shared by the build hooks and the search widget.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

/// A page as handed over by the host generator.
///
/// Only these three fields are assumed; the host's own page representation
/// stays on its side of the hook boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    /// Relative document identifier (e.g. `guides/install.md`).
    pub path: String,
    /// Page title, possibly empty.
    pub title: String,
    /// Markdown content; rewritten in place by the transpiler.
    pub content: String,
}

impl Page {
    pub fn new(path: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            title: title.into(),
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// IndexedPage
// ---------------------------------------------------------------------------

/// One entry of the search artifact (`search_pages.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedPage {
    pub path: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

// ---------------------------------------------------------------------------
// QueryResult
// ---------------------------------------------------------------------------

/// A single search hit shown by the widget, deduplicated by path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryResult {
    pub path: String,
    pub title: String,
}
