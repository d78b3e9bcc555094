//! Stages that deal with inline tokens and template delimiters.
//!
//! These run before the block expansions: embeds become `urlembed` blocks,
//! `{{word}}` placeholders are escaped and re-surfaced as code spans, and
//! pages on the escape list get their in-script delimiters neutralized.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use booksearch_shared::Result;

use crate::PageContext;

// ---------------------------------------------------------------------------
// Stage 1: Embeds
// ---------------------------------------------------------------------------

/// Rewrite `{% embed url="https://..." %}` into a `urlembed` block.
///
/// Quotes and the `url=` prefix are optional and trailing attributes are
/// tolerated. Anything that is not an http(s) URL is left as-is.
pub(crate) fn normalize_embeds(md: &str, _ctx: &PageContext<'_>) -> Result<String> {
    static EMBED_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"\{%\s*embed\s+(?:url=)?["']?([^"'\s%}]+)["']?(?:\s+[^%}]*)?%\}"#)
            .expect("valid regex")
    });

    Ok(EMBED_RE
        .replace_all(md, |caps: &Captures| {
            let url = &caps[1];
            if url.starts_with("http://") || url.starts_with("https://") {
                format!("{{% urlembed %}}\n{url}\n{{% endurlembed %}}")
            } else {
                caps[0].to_string()
            }
        })
        .into_owned())
}

// ---------------------------------------------------------------------------
// Stage 2: Escape word placeholders
// ---------------------------------------------------------------------------

/// Escape `{{identifier}}` so the host template engine leaves it alone.
pub(crate) fn escape_braces(md: &str, _ctx: &PageContext<'_>) -> Result<String> {
    static WORD_VAR_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("valid regex"));

    Ok(WORD_VAR_RE.replace_all(md, r"\{{${1}\}}").into_owned())
}

// ---------------------------------------------------------------------------
// Stage 3: Unwrap escaped placeholders
// ---------------------------------------------------------------------------

/// Turn `\{{ expr \}}` into `` `{{expr}}` ``.
///
/// The escape mark may sit on either side or both.
pub(crate) fn unwrap_escaped(md: &str, _ctx: &PageContext<'_>) -> Result<String> {
    static ESCAPED_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\\\{\{\s*([^}]+?)\s*\\?\}\}|\{\{\s*([^}\\]+?)\s*\\\}\}")
            .expect("valid regex")
    });

    Ok(ESCAPED_RE
        .replace_all(md, |caps: &Captures| {
            let inner = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map_or("", |m| m.as_str());
            format!("`{{{{{}}}}}`", inner.trim())
        })
        .into_owned())
}

// ---------------------------------------------------------------------------
// Stage 8: Script delimiter escaping
// ---------------------------------------------------------------------------

/// Neutralize template delimiters inside `<script>` bodies, `<product-form>`
/// opening tags and `{%- … -%}` regions.
///
/// Only applies to pages listed in `script_escape_pages`.
pub(crate) fn escape_script_delimiters(md: &str, ctx: &PageContext<'_>) -> Result<String> {
    static SCRIPT_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?is)<script.*?>.*?</script>").expect("valid regex"));
    static PRODUCT_FORM_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?is)<product-form.*?>").expect("valid regex"));
    static TRIM_TAG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)\{%-.*?-%\}").expect("valid regex"));

    if !ctx.escape_scripts {
        return Ok(md.to_string());
    }

    let escaped = SCRIPT_RE.replace_all(md, |caps: &Captures| escape_delimiters(&caps[0]));
    let escaped = PRODUCT_FORM_RE.replace_all(&escaped, |caps: &Captures| escape_delimiters(&caps[0]));
    let escaped = TRIM_TAG_RE.replace_all(&escaped, |caps: &Captures| {
        caps[0].replace("{%-", "&#123;%-").replace("-%}", "-%&#125;")
    });

    Ok(escaped.into_owned())
}

/// Replace every template delimiter with numeric character references.
///
/// Whitespace-trim forms go first so `{%-` does not turn into `&#123;%` + `-`.
fn escape_delimiters(block: &str) -> String {
    block
        .replace("{{", "&#123;&#123;")
        .replace("}}", "&#125;&#125;")
        .replace("{%-", "&#123;%-")
        .replace("-%}", "-%&#125;")
        .replace("{%", "&#123;%")
        .replace("%}", "%&#125;")
}
