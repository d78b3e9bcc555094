//! Search widget state machine.
//!
//! ```text
//! Uninitialized ─init─▶ LibraryLoading ─▶ UiReady(IndexLoading) ─▶ UiReady(IndexReady)
//!                              │                    └──────────▶ UiReady(IndexFailed)
//!                              └──────▶ Disabled
//! ```
//!
//! The host drives it: `init` once, `setup_ui` again after every in-page
//! navigation, `on_input` per keystroke and `poll` from its timer.

use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use booksearch_shared::{QueryResult, SearchConfig};

use crate::index::{SearchIndex, Tokenize, flatten_results};
use crate::render::{self, LOADING_HTML, NO_RESULTS_HTML};
use crate::source::ArtifactSource;

/// Progress of the page index.
#[derive(Debug)]
pub enum IndexState {
    Loading,
    Ready(SearchIndex),
    /// The artifact could not be fetched or parsed; queries find nothing.
    Failed,
}

#[derive(Debug)]
pub enum WidgetState {
    Uninitialized,
    LibraryLoading,
    UiReady(IndexState),
    /// The index backend could not be set up. No retry.
    Disabled,
}

/// Whether `setup_ui` built the UI or found it already in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiSetup {
    Created,
    Reused,
}

/// The results dropdown as the host should display it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dropdown {
    pub visible: bool,
    pub html: String,
}

// ---------------------------------------------------------------------------
// Debouncer
// ---------------------------------------------------------------------------

/// Holds back the latest input until it has been quiet for `delay`.
///
/// Every `push` replaces the pending value and restarts the timer.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<(String, Instant)>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn push(&mut self, value: impl Into<String>, now: Instant) {
        self.pending = Some((value.into(), now + self.delay));
    }

    /// Take the pending value once its quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some((_, due)) if *due <= now => self.pending.take().map(|(value, _)| value),
            _ => None,
        }
    }

    /// When the pending value becomes available, if any.
    pub fn due(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, due)| *due)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

// ---------------------------------------------------------------------------
// SearchWidget
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct SearchWidget {
    config: SearchConfig,
    location_path: String,
    state: WidgetState,
    initialized: bool,
    ui_built: bool,
    tokenize: Tokenize,
    debouncer: Debouncer,
    dropdown: Dropdown,
    results: Vec<QueryResult>,
}

impl SearchWidget {
    /// `location_path` is the path of the page the widget lives on
    /// (e.g. `/guide/setup.html`); result links are relative to it.
    pub fn new(config: SearchConfig, location_path: impl Into<String>) -> Self {
        let debouncer = Debouncer::new(Duration::from_millis(config.debounce_ms));
        Self {
            config,
            location_path: location_path.into(),
            state: WidgetState::Uninitialized,
            initialized: false,
            ui_built: false,
            tokenize: Tokenize::Forward,
            debouncer,
            dropdown: Dropdown::default(),
            results: Vec::new(),
        }
    }

    pub fn state(&self) -> &WidgetState {
        &self.state
    }

    pub fn dropdown(&self) -> &Dropdown {
        &self.dropdown
    }

    /// Hits of the last query that ran.
    pub fn results(&self) -> &[QueryResult] {
        &self.results
    }

    pub fn is_index_ready(&self) -> bool {
        matches!(self.state, WidgetState::UiReady(IndexState::Ready(_)))
    }

    /// Bring the widget up: set up the index backend, build the UI and load
    /// the artifact. Only the first call does anything.
    pub async fn init<S: ArtifactSource>(&mut self, source: &S) {
        if self.initialized {
            return;
        }
        self.initialized = true;

        self.state = WidgetState::LibraryLoading;
        match self.config.tokenize.parse::<Tokenize>() {
            Ok(tokenize) => self.tokenize = tokenize,
            Err(e) => {
                error!(error = %e, "failed to load search library, search disabled");
                self.state = WidgetState::Disabled;
                return;
            }
        }

        self.setup_ui();
        self.state = WidgetState::UiReady(IndexState::Loading);
        self.load_index(source).await;
    }

    /// Build the input and results container, or reuse the existing ones.
    /// Never touches the index.
    pub fn setup_ui(&mut self) -> UiSetup {
        if self.ui_built {
            return UiSetup::Reused;
        }
        self.ui_built = true;
        UiSetup::Created
    }

    /// The host navigated to another page without a full reload.
    pub fn on_page_change(&mut self, location_path: impl Into<String>) -> UiSetup {
        self.location_path = location_path.into();
        self.setup_ui()
    }

    async fn load_index<S: ArtifactSource>(&mut self, source: &S) {
        match source.fetch().await {
            Ok(pages) => {
                let index = SearchIndex::from_pages(self.tokenize, &pages);
                info!(pages = index.len(), "search index built");
                self.state = WidgetState::UiReady(IndexState::Ready(index));
            }
            Err(e) => {
                warn!(source = %source.describe(), error = %e, "could not load search index");
                warn!("run `booksearch build` to generate the search index");
                self.state = WidgetState::UiReady(IndexState::Failed);
            }
        }
    }

    /// Record a keystroke; the query runs once input has been quiet.
    pub fn on_input(&mut self, value: &str, now: Instant) {
        if matches!(self.state, WidgetState::Disabled | WidgetState::Uninitialized) {
            return;
        }
        self.debouncer.push(value, now);
    }

    /// Run the pending query if its quiet period is over. Returns whether a
    /// query ran.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.debouncer.poll(now) {
            Some(query) => {
                self.perform_search(&query);
                true
            }
            None => false,
        }
    }

    /// When the pending query becomes due, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncer.due()
    }

    pub fn on_focus(&mut self) {
        if !self.dropdown.html.is_empty() {
            self.dropdown.visible = true;
        }
    }

    pub fn on_escape(&mut self) {
        self.dropdown.visible = false;
    }

    pub fn on_click_outside(&mut self) {
        self.dropdown.visible = false;
    }

    fn perform_search(&mut self, raw: &str) {
        let query = raw.trim();

        if query.is_empty() {
            self.results.clear();
            self.dropdown = Dropdown::default();
            return;
        }

        let index = match &self.state {
            WidgetState::UiReady(IndexState::Ready(index)) => index,
            WidgetState::UiReady(IndexState::Failed) => {
                self.results.clear();
                self.show(NO_RESULTS_HTML.to_string());
                return;
            }
            _ => {
                self.results.clear();
                self.show(LOADING_HTML.to_string());
                return;
            }
        };

        let results = index.search(query, self.config.result_limit);
        self.results = flatten_results(&results);

        let base = render::base_path(&self.location_path);
        let html = render::render_results(&self.results, query, &base);
        self.show(html);
    }

    fn show(&mut self, html: String) {
        self.dropdown = Dropdown { visible: true, html };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use booksearch_shared::{BookSearchError, IndexedPage, Result};

    struct StaticSource(Vec<IndexedPage>);

    impl ArtifactSource for StaticSource {
        fn describe(&self) -> String {
            "static".into()
        }

        async fn fetch(&self) -> Result<Vec<IndexedPage>> {
            Ok(self.0.clone())
        }
    }

    struct MissingSource;

    impl ArtifactSource for MissingSource {
        fn describe(&self) -> String {
            "missing".into()
        }

        async fn fetch(&self) -> Result<Vec<IndexedPage>> {
            Err(BookSearchError::Network("HTTP 404".into()))
        }
    }

    fn pages() -> Vec<IndexedPage> {
        vec![
            IndexedPage {
                path: "guide/setup.md".into(),
                title: "Setup".into(),
                content: "Install and configure.".into(),
            },
            IndexedPage {
                path: "intro.md".into(),
                title: "Introduction".into(),
                content: "Read the setup guide first.".into(),
            },
        ]
    }

    fn widget() -> SearchWidget {
        SearchWidget::new(SearchConfig::default(), "/guide/setup.html")
    }

    fn type_and_wait(w: &mut SearchWidget, query: &str) {
        let now = Instant::now();
        w.on_input(query, now);
        assert!(w.poll(now + Duration::from_millis(200)));
    }

    #[test]
    fn debouncer_waits_for_quiet_period() {
        let start = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(200));

        d.push("s", start);
        d.push("se", start + Duration::from_millis(100));
        assert_eq!(d.poll(start + Duration::from_millis(250)), None);
        assert_eq!(d.poll(start + Duration::from_millis(300)), Some("se".to_string()));
        assert!(!d.is_pending());
    }

    #[tokio::test]
    async fn deadline_stays_fixed_until_next_input() {
        let mut w = widget();
        w.init(&StaticSource(pages())).await;
        assert_eq!(w.next_deadline(), None);

        let t0 = Instant::now();
        w.on_input("x", t0);
        assert_eq!(w.next_deadline(), Some(t0 + Duration::from_millis(200)));
        assert!(!w.poll(t0 + Duration::from_millis(150)));
        assert_eq!(w.next_deadline(), Some(t0 + Duration::from_millis(200)));

        w.on_input("xy", t0 + Duration::from_millis(150));
        assert_eq!(w.next_deadline(), Some(t0 + Duration::from_millis(350)));

        assert!(w.poll(t0 + Duration::from_millis(350)));
        assert_eq!(w.next_deadline(), None);
    }

    #[tokio::test]
    async fn init_reaches_index_ready() {
        let mut w = widget();
        assert!(matches!(w.state(), WidgetState::Uninitialized));

        w.init(&StaticSource(pages())).await;
        assert!(w.is_index_ready());
    }

    #[tokio::test]
    async fn init_is_idempotent() {
        let mut w = widget();
        w.init(&StaticSource(pages())).await;
        w.init(&MissingSource).await;
        assert!(w.is_index_ready());
    }

    #[tokio::test]
    async fn ui_is_reused_after_navigation() {
        let mut w = widget();
        w.init(&StaticSource(pages())).await;

        assert_eq!(w.on_page_change("/intro.html"), UiSetup::Reused);
        assert!(w.is_index_ready());
    }

    #[tokio::test]
    async fn query_renders_deduplicated_results() {
        let mut w = widget();
        w.init(&StaticSource(pages())).await;

        type_and_wait(&mut w, "setup");

        let paths: Vec<_> = w.results().iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, ["guide/setup.md", "intro.md"]);

        let dropdown = w.dropdown();
        assert!(dropdown.visible);
        assert!(dropdown.html.contains(r#"href="../guide/setup.html""#));
        assert!(dropdown.html.contains("<mark>Setup</mark>"));
    }

    #[tokio::test]
    async fn empty_query_hides_results() {
        let mut w = widget();
        w.init(&StaticSource(pages())).await;

        type_and_wait(&mut w, "setup");
        type_and_wait(&mut w, "   ");
        assert_eq!(w.dropdown(), &Dropdown::default());
        assert!(w.results().is_empty());
    }

    #[test]
    fn query_before_index_shows_loading() {
        let mut w = widget();
        w.state = WidgetState::UiReady(IndexState::Loading);

        type_and_wait(&mut w, "setup");
        assert_eq!(w.dropdown().html, LOADING_HTML);
        assert!(w.dropdown().visible);
    }

    #[tokio::test]
    async fn failed_fetch_shows_no_results() {
        let mut w = widget();
        w.init(&MissingSource).await;
        assert!(matches!(w.state(), WidgetState::UiReady(IndexState::Failed)));

        type_and_wait(&mut w, "setup");
        assert_eq!(w.dropdown().html, NO_RESULTS_HTML);
    }

    #[tokio::test]
    async fn bad_tokenizer_disables_widget() {
        let config = SearchConfig {
            tokenize: "phonetic".into(),
            ..SearchConfig::default()
        };
        let mut w = SearchWidget::new(config, "/index.html");
        w.init(&StaticSource(pages())).await;

        assert!(matches!(w.state(), WidgetState::Disabled));
        let now = Instant::now();
        w.on_input("setup", now);
        assert!(!w.poll(now + Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn escape_and_outside_click_hide_dropdown() {
        let mut w = widget();
        w.init(&StaticSource(pages())).await;
        type_and_wait(&mut w, "intro");

        w.on_escape();
        assert!(!w.dropdown().visible);

        w.on_focus();
        assert!(w.dropdown().visible);

        w.on_click_outside();
        assert!(!w.dropdown().visible);
    }
}
