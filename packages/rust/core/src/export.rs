//! Search artifact exporter.
//!
//! Writes the accumulated pages as one compact JSON array to
//! `<output_root>/<assets.dir>/<index.file_name>`. Unlike the per-page hooks,
//! every failure here propagates: a missing artifact silently disables search.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use booksearch_shared::{AssetsConfig, BookSearchError, IndexConfig, IndexedPage, Result};

/// Summary of a written search artifact.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExportReport {
    /// Absolute or output-root-relative path of the artifact.
    pub path: PathBuf,
    pub page_count: usize,
    pub size_bytes: usize,
    /// Hex SHA-256 of the written payload.
    pub sha256: String,
}

/// Serialize `pages` into the search artifact.
///
/// Content is truncated to `index.max_content_chars` characters. The file is
/// written to a dot-prefixed temp file first and then renamed into place, so
/// readers never see a half-written artifact.
#[instrument(skip_all, fields(output_root = %output_root.display(), pages = pages.len()))]
pub fn export(
    pages: &[IndexedPage],
    output_root: &Path,
    assets: &AssetsConfig,
    index: &IndexConfig,
) -> Result<ExportReport> {
    let assets_dir = output_root.join(&assets.dir);

    if !assets_dir.exists() {
        std::fs::create_dir_all(&assets_dir).map_err(|e| BookSearchError::io(&assets_dir, e))?;
        debug!(path = %assets_dir.display(), "created assets directory");
    }

    info!(
        assets_dir = %assets_dir.display(),
        total_pages = pages.len(),
        "building search index"
    );

    let entries: Vec<IndexedPage> = pages
        .iter()
        .map(|page| IndexedPage {
            path: page.path.clone(),
            title: page.title.clone(),
            content: truncate_chars(&page.content, index.max_content_chars).to_string(),
        })
        .collect();

    let payload = serde_json::to_string(&entries)?;

    let target = assets_dir.join(&index.file_name);
    let temp = assets_dir.join(format!(".{}.tmp", index.file_name));

    std::fs::write(&temp, &payload).map_err(|e| BookSearchError::io(&temp, e))?;
    std::fs::rename(&temp, &target).map_err(|e| BookSearchError::io(&target, e))?;

    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    let sha256 = format!("{:x}", hasher.finalize());

    info!(
        path = %target.display(),
        page_count = entries.len(),
        size_bytes = payload.len(),
        "wrote search artifact"
    );

    Ok(ExportReport {
        path: target,
        page_count: entries.len(),
        size_bytes: payload.len(),
        sha256,
    })
}

/// Copy the configured stylesheets and scripts from `source_dir` into the
/// output assets directory. Listed files that do not exist are skipped with
/// a warning; copy failures propagate.
#[instrument(skip_all, fields(source = %source_dir.display()))]
pub fn copy_assets(
    source_dir: &Path,
    output_root: &Path,
    assets: &AssetsConfig,
) -> Result<Vec<PathBuf>> {
    let target_dir = output_root.join(&assets.dir);
    std::fs::create_dir_all(&target_dir).map_err(|e| BookSearchError::io(&target_dir, e))?;

    let mut copied = Vec::new();
    for name in assets.styles.iter().chain(&assets.scripts) {
        let from = source_dir.join(name);
        if !from.is_file() {
            warn!(file = %from.display(), "configured asset not found, skipping");
            continue;
        }

        let to = target_dir.join(name);
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BookSearchError::io(parent, e))?;
        }
        std::fs::copy(&from, &to).map_err(|e| BookSearchError::io(&to, e))?;
        debug!(file = %to.display(), "copied asset");
        copied.push(to);
    }

    Ok(copied)
}

/// Prefix of `s` holding at most `max` characters.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
