//! HTML for the results dropdown, plus the path helpers it needs.

use regex::RegexBuilder;

use booksearch_shared::QueryResult;

pub const LOADING_HTML: &str =
    r#"<div class="search-result-item search-result-loading">Loading search index...</div>"#;

pub const NO_RESULTS_HTML: &str =
    r#"<div class="search-result-item search-result-empty">No results found</div>"#;

/// Relative prefix from the current page back to the site root:
/// one `../` per directory level, or `./` at the top.
pub fn base_path(location_path: &str) -> String {
    let depth = location_path.matches('/').count().saturating_sub(1);
    if depth == 0 {
        "./".to_string()
    } else {
        "../".repeat(depth)
    }
}

/// Link to the rendered page for a source path (`a/b.md` → `a/b.html`).
pub fn result_href(base: &str, path: &str) -> String {
    match path.strip_suffix(".md") {
        Some(stem) => format!("{base}{stem}.html"),
        None => format!("{base}{path}"),
    }
}

/// Readable fallback title for a page path: `guides/quick-start.md` →
/// `Guides › Quick Start`.
pub fn format_path(path: &str) -> String {
    let stem = path.strip_suffix(".md").unwrap_or(path);
    let spaced = stem.replace(['_', '-'], " ").replace('/', " › ");

    let mut out = String::with_capacity(spaced.len());
    let mut prev_is_word = false;
    for c in spaced.chars() {
        let is_word = c.is_alphanumeric() || c == '_';
        if is_word && !prev_is_word {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        prev_is_word = is_word;
    }
    out
}

/// Escape text for safe inclusion in HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape `text` and wrap every case-insensitive occurrence of `query` in
/// `<mark>`. Matches are found on the raw text, so the query never matches
/// inside an entity produced by escaping. Regex metacharacters in the query
/// are matched literally.
pub fn highlight(text: &str, query: &str) -> String {
    let query = query.trim();
    if text.is_empty() || query.is_empty() {
        return escape_html(text);
    }

    let Ok(re) = RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
    else {
        return escape_html(text);
    };

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in re.find_iter(text) {
        out.push_str(&escape_html(&text[last..m.start()]));
        out.push_str("<mark>");
        out.push_str(&escape_html(m.as_str()));
        out.push_str("</mark>");
        last = m.end();
    }
    out.push_str(&escape_html(&text[last..]));
    out
}

/// Markup for a list of hits.
pub fn render_results(items: &[QueryResult], query: &str, base: &str) -> String {
    if items.is_empty() {
        return NO_RESULTS_HTML.to_string();
    }

    items
        .iter()
        .map(|item| {
            let title = if item.title.is_empty() {
                format_path(&item.path)
            } else {
                item.title.clone()
            };
            format!(
                r#"<a href="{href}" class="search-result-item"><div class="search-result-title">{title}</div><div class="search-result-path">{path}</div></a>"#,
                href = escape_html(&result_href(base, &item.path)),
                title = highlight(&title, query),
                path = escape_html(&item.path),
            )
        })
        .collect()
}
