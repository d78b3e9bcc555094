//! Build session: hook entry points and the page accumulator.

use std::path::Path;

use tracing::{debug, info, instrument};

use booksearch_markdown::{Transpiler, strip_front_matter};
use booksearch_shared::{AppConfig, IndexedPage, Page, Result};

use crate::export::{ExportReport, export};

/// The three hooks a host generator calls during a build.
///
/// `on_before_page_render` never fails: one malformed page must not abort
/// the build. `on_build_finish` propagates errors.
pub trait BuildHooks {
    /// Called once at build start.
    fn on_build_init(&mut self);
    /// Called once per page, in processing order.
    fn on_before_page_render(&mut self, page: Page) -> Page;
    /// Called once after every page hook has returned.
    fn on_build_finish(&mut self, output_root: &Path) -> Result<ExportReport>;
}

/// Per-build state owned by the host-invocation boundary.
///
/// All hooks take `&mut self`, so appends are exclusive by construction. A
/// host that renders pages in parallel has to put the session behind a
/// `Mutex` and lock around each page hook.
#[derive(Debug)]
pub struct BuildSession {
    config: AppConfig,
    transpiler: Transpiler,
    pages: Vec<IndexedPage>,
    partial_pages: usize,
}

impl BuildSession {
    pub fn new(config: AppConfig) -> Self {
        let transpiler = Transpiler::new(&config.transform);
        Self {
            config,
            transpiler,
            pages: Vec::new(),
            partial_pages: 0,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Drop everything recorded so far.
    pub fn reset(&mut self) {
        self.pages.clear();
        self.partial_pages = 0;
    }

    /// Append a page snapshot with its front matter stripped.
    ///
    /// Pages are not deduplicated by path. An empty path is replaced with
    /// `unknown_<n>`, `n` being the number of pages recorded before it.
    pub fn record(&mut self, path: &str, title: &str, content: &str) {
        let path = if path.is_empty() {
            format!("unknown_{}", self.pages.len())
        } else {
            path.to_string()
        };

        self.pages.push(IndexedPage {
            path,
            title: title.to_string(),
            content: strip_front_matter(content),
        });
    }

    /// Pages recorded in this build, in processing order.
    pub fn pages(&self) -> &[IndexedPage] {
        &self.pages
    }

    /// Number of pages whose transform stopped early.
    pub fn partial_pages(&self) -> usize {
        self.partial_pages
    }
}

impl BuildHooks for BuildSession {
    fn on_build_init(&mut self) {
        debug!(stale = self.pages.len(), "build init, clearing accumulator");
        self.reset();
    }

    #[instrument(skip_all, fields(path = %page.path))]
    fn on_before_page_render(&mut self, mut page: Page) -> Page {
        let outcome = self.transpiler.run(&page.path, &page.content);
        if !outcome.is_complete() {
            self.partial_pages += 1;
        }
        page.content = outcome.content;

        self.record(&page.path, &page.title, &page.content);
        page
    }

    fn on_build_finish(&mut self, output_root: &Path) -> Result<ExportReport> {
        let report = export(
            &self.pages,
            output_root,
            &self.config.assets,
            &self.config.index,
        )?;

        info!(
            pages = report.page_count,
            partial = self.partial_pages,
            "search index done"
        );

        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
