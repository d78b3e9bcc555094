//! Where the widget gets `search_pages.json` from.

use std::future::Future;
use std::path::PathBuf;

use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use booksearch_shared::{AssetsConfig, BookSearchError, IndexConfig, IndexedPage, Result};

use crate::render::base_path;

/// Default timeout in seconds for fetching the artifact.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Maximum artifact size we accept (50 MB).
const MAX_ARTIFACT_SIZE: u64 = 50 * 1024 * 1024;

/// User-Agent string for artifact requests.
const USER_AGENT: &str = concat!("booksearch/", env!("CARGO_PKG_VERSION"));

/// Anything that can produce the exported page list.
pub trait ArtifactSource {
    /// Human-readable location, used in log messages.
    fn describe(&self) -> String;

    fn fetch(&self) -> impl Future<Output = Result<Vec<IndexedPage>>> + Send;
}

/// Resolve the artifact URL the way the browser widget does: relative to the
/// current page, climbing one `../` per path segment.
pub fn artifact_url(page_url: &Url, assets: &AssetsConfig, index: &IndexConfig) -> Result<Url> {
    let relative = format!(
        "{}{}/{}",
        base_path(page_url.path()),
        assets.dir.trim_matches('/'),
        index.file_name
    );
    page_url
        .join(&relative)
        .map_err(|e| BookSearchError::validation(format!("cannot resolve {relative} against {page_url}: {e}")))
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// Fetches the artifact with a GET request.
#[derive(Debug, Clone)]
pub struct HttpArtifactSource {
    client: Client,
    url: Url,
}

impl HttpArtifactSource {
    pub fn new(url: Url) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| BookSearchError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, url })
    }

    /// Source for the artifact as seen from a rendered page.
    pub fn for_page(page_url: &Url, assets: &AssetsConfig, index: &IndexConfig) -> Result<Self> {
        Self::new(artifact_url(page_url, assets, index)?)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl ArtifactSource for HttpArtifactSource {
    fn describe(&self) -> String {
        self.url.to_string()
    }

    #[instrument(skip_all, fields(url = %self.url))]
    async fn fetch(&self) -> Result<Vec<IndexedPage>> {
        let url = &self.url;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| BookSearchError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BookSearchError::Network(format!("{url}: HTTP {status}")));
        }

        if let Some(len) = response.content_length() {
            if len > MAX_ARTIFACT_SIZE {
                return Err(BookSearchError::validation(format!(
                    "{url}: artifact too large ({len} bytes, max {MAX_ARTIFACT_SIZE})"
                )));
            }
        }

        let body = response
            .text()
            .await
            .map_err(|e| BookSearchError::Network(format!("{url}: failed to read body: {e}")))?;

        debug!(bytes = body.len(), "artifact downloaded");
        parse_artifact(&body)
    }
}

// ---------------------------------------------------------------------------
// Filesystem
// ---------------------------------------------------------------------------

/// Reads the artifact from a local build output.
#[derive(Debug, Clone)]
pub struct FileArtifactSource {
    path: PathBuf,
}

impl FileArtifactSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ArtifactSource for FileArtifactSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<Vec<IndexedPage>> {
        let body = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| BookSearchError::io(&self.path, e))?;
        parse_artifact(&body)
    }
}

fn parse_artifact(body: &str) -> Result<Vec<IndexedPage>> {
    serde_json::from_str(body)
        .map_err(|e| BookSearchError::Serialization(format!("invalid search artifact: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTIFACT: &str =
        r#"[{"path":"intro.md","title":"Intro","content":"Welcome"},{"path":"guide/setup.md","title":"Setup","content":"Install it"}]"#;

    #[test]
    fn artifact_url_from_nested_page() {
        let page = Url::parse("https://docs.example.com/guide/setup.html").unwrap();
        let url = artifact_url(&page, &AssetsConfig::default(), &IndexConfig::default()).unwrap();
        assert_eq!(url.as_str(), "https://docs.example.com/assets/search_pages.json");
    }

    #[test]
    fn artifact_url_from_root_page() {
        let page = Url::parse("https://docs.example.com/index.html").unwrap();
        let url = artifact_url(&page, &AssetsConfig::default(), &IndexConfig::default()).unwrap();
        assert_eq!(url.as_str(), "https://docs.example.com/assets/search_pages.json");
    }

    #[tokio::test]
    async fn http_source_fetches_artifact() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/assets/search_pages.json"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(ARTIFACT))
            .mount(&server)
            .await;

        let page = Url::parse(&format!("{}/guide/setup.html", server.uri())).unwrap();
        let source =
            HttpArtifactSource::for_page(&page, &AssetsConfig::default(), &IndexConfig::default())
                .unwrap();
        let pages = source.fetch().await.unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].path, "guide/setup.md");
    }

    #[tokio::test]
    async fn http_source_reports_missing_artifact() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/assets/search_pages.json"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/assets/search_pages.json", server.uri())).unwrap();
        let err = HttpArtifactSource::new(url).unwrap().fetch().await.unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn file_source_reads_artifact() {
        let path = std::env::temp_dir().join(format!("bs-artifact-{}.json", uuid::Uuid::now_v7()));
        std::fs::write(&path, ARTIFACT).unwrap();

        let pages = FileArtifactSource::new(&path).fetch().await.unwrap();
        assert_eq!(pages[0].title, "Intro");

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn file_source_rejects_malformed_json() {
        let path = std::env::temp_dir().join(format!("bs-artifact-{}.json", uuid::Uuid::now_v7()));
        std::fs::write(&path, "{\"not\": \"an array\"}").unwrap();

        let err = FileArtifactSource::new(&path).fetch().await.unwrap_err();
        assert!(matches!(err, BookSearchError::Serialization(_)));

        let _ = std::fs::remove_file(&path);
    }
}
