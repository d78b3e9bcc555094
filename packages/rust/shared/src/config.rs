//! Plugin configuration for booksearch.
//!
//! Config is read from an explicit `--config` path, else `./booksearch.toml`,
//! else `~/.booksearch/booksearch.toml`. Missing files fall back to defaults.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BookSearchError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "booksearch.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".booksearch";

// ---------------------------------------------------------------------------
// Config structs (matching booksearch.toml schema)
// ---------------------------------------------------------------------------

/// Top-level plugin config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Asset directory and the extra files a host should inject.
    #[serde(default)]
    pub assets: AssetsConfig,

    /// Shorthand transform options.
    #[serde(default)]
    pub transform: TransformConfig,

    /// Search artifact export options.
    #[serde(default)]
    pub index: IndexConfig,

    /// Client search widget options.
    #[serde(default)]
    pub search: SearchConfig,
}

/// `[assets]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Directory (relative to the build output root) holding plugin assets
    /// and the search artifact.
    #[serde(default = "default_assets_dir")]
    pub dir: String,

    /// Stylesheets the host should inject into every rendered page.
    #[serde(default = "default_styles")]
    pub styles: Vec<String>,

    /// Scripts the host should inject into every rendered page.
    #[serde(default = "default_scripts")]
    pub scripts: Vec<String>,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            dir: default_assets_dir(),
            styles: default_styles(),
            scripts: default_scripts(),
        }
    }
}

fn default_assets_dir() -> String {
    "assets".into()
}
fn default_styles() -> Vec<String> {
    vec!["search.css".into()]
}
fn default_scripts() -> Vec<String> {
    vec!["search.js".into()]
}

/// `[transform]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Page paths whose `<script>` bodies, `<product-form>` tags and
    /// `{%- … -%}` regions get their template delimiters escaped.
    #[serde(default)]
    pub script_escape_pages: BTreeSet<String>,
}

/// `[index]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Artifact file name inside the assets directory.
    #[serde(default = "default_index_file_name")]
    pub file_name: String,

    /// Maximum number of characters of page content kept per entry.
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            file_name: default_index_file_name(),
            max_content_chars: default_max_content_chars(),
        }
    }
}

fn default_index_file_name() -> String {
    "search_pages.json".into()
}
fn default_max_content_chars() -> usize {
    5000
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum hits returned per field.
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,

    /// Quiet period before a typed query runs.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Tokenizer mode: "strict", "forward" or "full".
    #[serde(default = "default_tokenize")]
    pub tokenize: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            result_limit: default_result_limit(),
            debounce_ms: default_debounce_ms(),
            tokenize: default_tokenize(),
        }
    }
}

fn default_result_limit() -> usize {
    20
}
fn default_debounce_ms() -> u64 {
    200
}
fn default_tokenize() -> String {
    "forward".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the user config directory (`~/.booksearch/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| BookSearchError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the user config file (`~/.booksearch/booksearch.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the user config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| BookSearchError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        BookSearchError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Resolve the effective config: an explicit path must exist, otherwise a
/// project-local `booksearch.toml` wins over the user config.
pub fn resolve_config(explicit: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        return load_config_from(path);
    }

    let local = Path::new(CONFIG_FILE_NAME);
    if local.exists() {
        tracing::debug!(path = %local.display(), "using project config");
        return load_config_from(local);
    }

    load_config()
}

/// Write a default config file into `dir` (created if needed).
/// Returns the path to the created file.
pub fn init_config(dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| BookSearchError::io(dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| BookSearchError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| BookSearchError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("search_pages.json"));
        assert!(toml_str.contains("forward"));
    }

    #[test]
    fn defaults_match_plugin_behavior() {
        let config = AppConfig::default();
        assert_eq!(config.assets.dir, "assets");
        assert_eq!(config.index.max_content_chars, 5000);
        assert_eq!(config.search.result_limit, 20);
        assert_eq!(config.search.debounce_ms, 200);
        assert!(config.transform.script_escape_pages.is_empty());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[transform]
script_escape_pages = ["guides/theme-banner.md"]

[search]
result_limit = 5
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert!(
            config
                .transform
                .script_escape_pages
                .contains("guides/theme-banner.md")
        );
        assert_eq!(config.search.result_limit, 5);
        assert_eq!(config.search.debounce_ms, 200);
        assert_eq!(config.index.file_name, "search_pages.json");
    }

    #[test]
    fn init_then_load_roundtrip() {
        let dir = std::env::temp_dir().join(format!("bs-config-test-{}", uuid::Uuid::now_v7()));
        let path = init_config(&dir).expect("init");
        let loaded = load_config_from(&path).expect("load");
        assert_eq!(loaded.assets.scripts, vec!["search.js".to_string()]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let missing = std::env::temp_dir().join(format!("bs-missing-{}.toml", uuid::Uuid::now_v7()));
        let err = resolve_config(Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("I/O error"));
    }
}
