//! Block expansions: `content-ref`, `stepper`, `tabs`, `columns` and
//! `formatted-code`.
//!
//! Every block regex is non-greedy, so a block closes at its first matching
//! end tag. Nested blocks of the same kind are not supported; the outer
//! opening pairs with the inner end tag and the leftover end tag passes
//! through untouched.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use booksearch_shared::Result;

use crate::PageContext;

// ---------------------------------------------------------------------------
// Stage 4: Content references
// ---------------------------------------------------------------------------

/// Replace `{% content-ref url="..." %}BODY{% endcontent-ref %}` with BODY,
/// or with a synthesized link when BODY is blank.
pub(crate) fn expand_content_refs(md: &str, _ctx: &PageContext<'_>) -> Result<String> {
    static CONTENT_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r#"(?s)\{%\s*content-ref\s+url=["']([^"']+)["']\s*%\}(.*?)\{%\s*endcontent-ref\s*%\}"#,
        )
        .expect("valid regex")
    });

    Ok(CONTENT_REF_RE
        .replace_all(md, |caps: &Captures| {
            let url = &caps[1];
            let body = caps[2].trim();
            if body.is_empty() {
                format!("[{}]({url})", link_text_for(url))
            } else {
                body.to_string()
            }
        })
        .into_owned())
}

/// Last path segment of `url` without a `.md` suffix.
fn link_text_for(url: &str) -> &str {
    let segment = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(url);
    segment.strip_suffix(".md").unwrap_or(segment)
}

// ---------------------------------------------------------------------------
// Stage 5: Steppers
// ---------------------------------------------------------------------------

/// Expand `{% stepper %}` blocks into numbered `## Step N: TITLE` sections.
pub(crate) fn expand_steppers(md: &str, _ctx: &PageContext<'_>) -> Result<String> {
    static STEPPER_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)\{%\s*stepper\s*%\}(.*?)\{%\s*endstepper\s*%\}").expect("valid regex")
    });

    Ok(STEPPER_RE
        .replace_all(md, |caps: &Captures| expand_steps(&caps[1]))
        .into_owned())
}

fn expand_steps(inner: &str) -> String {
    static STEP_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)\{%\s*step\s*%\}(.*?)\{%\s*endstep\s*%\}").expect("valid regex")
    });

    let mut number = 0usize;
    let converted = STEP_RE.replace_all(inner, |caps: &Captures| {
        number += 1;
        render_step(number, &caps[1])
    });

    collapse_blank_runs(&converted)
}

fn render_step(number: usize, content: &str) -> String {
    static H4_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^[ \t]*####[ \t]+(.+?)[ \t]*$").expect("valid regex")
    });

    let (title, body) = match H4_RE.captures(content) {
        Some(caps) => {
            let title = caps[1].trim().to_string();
            let line_end = caps.get(0).map_or(0, |m| m.end());
            let start = caps.get(0).map_or(0, |m| m.start());
            let rest = &content[line_end..];
            let rest = rest
                .strip_prefix("\r\n")
                .or_else(|| rest.strip_prefix('\n'))
                .unwrap_or(rest);
            (title, format!("{}{}", &content[..start], rest))
        }
        None => (format!("Step {number}"), content.to_string()),
    };

    let body = body.trim();
    if body.is_empty() {
        format!("\n## Step {number}: {title}")
    } else {
        format!("\n## Step {number}: {title}\n{body}\n")
    }
}

// ---------------------------------------------------------------------------
// Stage 6: Tabs
// ---------------------------------------------------------------------------

/// Expand `{% tabs %}` blocks into one `<details>` section per tab.
///
/// A tabs block without any `{% tab %}` children is left unchanged; it is
/// not replaced with an empty string.
pub(crate) fn expand_tabs(md: &str, _ctx: &PageContext<'_>) -> Result<String> {
    static TABS_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)\{%\s*tabs\s*%\}(.*?)\{%\s*endtabs\s*%\}").expect("valid regex")
    });
    static TAB_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"(?s)\{%\s*tab\s+title=["']([^"']+)["']\s*%\}(.*?)\{%\s*endtab\s*%\}"#)
            .expect("valid regex")
    });

    Ok(TABS_RE
        .replace_all(md, |caps: &Captures| {
            let sections: Vec<String> = TAB_RE
                .captures_iter(&caps[1])
                .map(|tab| {
                    format!(
                        "<details>\n<summary>{}</summary>\n\n{}\n\n</details>",
                        &tab[1],
                        tab[2].trim()
                    )
                })
                .collect();

            if sections.is_empty() {
                caps[0].to_string()
            } else {
                sections.join("\n\n")
            }
        })
        .into_owned())
}

// ---------------------------------------------------------------------------
// Stage 7: Columns
// ---------------------------------------------------------------------------

struct Column {
    heading: String,
    body: String,
}

/// Expand `{% columns %}` blocks into a one-row markdown table.
pub(crate) fn expand_columns(md: &str, _ctx: &PageContext<'_>) -> Result<String> {
    static COLUMNS_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)\{%\s*columns\s*%\}(.*?)\{%\s*endcolumns\s*%\}").expect("valid regex")
    });
    static COLUMN_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)\{%\s*column\s*%\}(.*?)\{%\s*endcolumn\s*%\}").expect("valid regex")
    });

    Ok(COLUMNS_RE
        .replace_all(md, |caps: &Captures| {
            let columns: Vec<Column> = COLUMN_RE
                .captures_iter(&caps[1])
                .map(|col| parse_column(&col[1]))
                .collect();

            if columns.is_empty() {
                return caps[0].to_string();
            }

            let headers: Vec<&str> = columns.iter().map(|c| c.heading.as_str()).collect();
            let separators = vec!["---"; columns.len()];
            let bodies: Vec<&str> = columns.iter().map(|c| c.body.as_str()).collect();

            format!(
                "| {} |\n|{}|\n| {} |",
                headers.join(" | "),
                separators.join("|"),
                bodies.join(" | ")
            )
        })
        .into_owned())
}

fn parse_column(raw: &str) -> Column {
    static LEADING_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\A#{1,6}[ \t]+(.+?)[ \t]*(?:\r?\n|\z)").expect("valid regex")
    });

    let content = raw.trim();

    let (heading, body) = match LEADING_HEADING_RE.captures(content) {
        Some(caps) => {
            let end = caps.get(0).map_or(0, |m| m.end());
            (caps[1].trim().to_string(), content[end..].trim())
        }
        None => (String::new(), content),
    };

    Column {
        heading,
        body: join_cell_lines(&collapse_blank_runs(body)),
    }
}

/// Fold a multi-line body into one table cell: newlines become `<br>`
/// except where the next line starts a list item.
fn join_cell_lines(body: &str) -> String {
    let mut cell = String::with_capacity(body.len());
    for (i, line) in body.split('\n').enumerate() {
        if i > 0 {
            if starts_list_item(line) {
                cell.push('\n');
            } else {
                cell.push_str("<br>");
            }
        }
        cell.push_str(line);
    }
    cell
}

fn starts_list_item(line: &str) -> bool {
    if line.starts_with('-') || line.starts_with('*') {
        return true;
    }
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    digits > 0 && line.as_bytes().get(digits) == Some(&b'.')
}

// ---------------------------------------------------------------------------
// Stage 9: Formatted code
// ---------------------------------------------------------------------------

/// Wrap `{% formatted-code %}` bodies in a styled container.
pub(crate) fn expand_formatted_code(md: &str, _ctx: &PageContext<'_>) -> Result<String> {
    static FORMATTED_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)\{%\s*formatted-code\s*%\}(.*?)\{%\s*endformatted-code\s*%\}")
            .expect("valid regex")
    });

    Ok(FORMATTED_CODE_RE
        .replace_all(md, r#"<div class="custom-formatted-code">${1}</div>"#)
        .into_owned())
}

/// `format-text` template filter: the text, uppercased when requested.
pub fn format_text(text: &str, uppercase: bool) -> String {
    if uppercase {
        text.to_uppercase()
    } else {
        text.to_string()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Collapse runs of 3+ newlines into a single blank line.
fn collapse_blank_runs(md: &str) -> String {
    static MULTI_NEWLINE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    MULTI_NEWLINE_RE.replace_all(md, "\n\n").into_owned()
}
