//! Front-matter stripping and title detection.

use std::sync::LazyLock;

use regex::Regex;

static FRONT_MATTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\A---[ \t]*\r?\n(?s:(.*?)\r?\n)?---[ \t]*(?:\r?\n|\z)").expect("valid regex")
});

/// Remove a leading `---` … `---` block and trim the rest.
///
/// Missing or unterminated front matter is not an error; the content is
/// returned trimmed.
pub fn strip_front_matter(md: &str) -> String {
    match FRONT_MATTER_RE.find(md) {
        Some(m) => md[m.end()..].trim().to_string(),
        None => md.trim().to_string(),
    }
}

/// Best-effort page title: front-matter `title:` first, then the first H1.
pub fn extract_title(md: &str) -> Option<String> {
    static H1_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^# (.+)$").expect("valid regex"));

    if let Some(title) = front_matter_title(md) {
        return Some(title);
    }

    let body = strip_front_matter(md);
    H1_RE
        .captures(&body)
        .map(|c| c[1].trim().to_string())
        .filter(|t| !t.is_empty())
}

fn front_matter_title(md: &str) -> Option<String> {
    let block = FRONT_MATTER_RE.captures(md)?.get(1)?.as_str();

    block.lines().find_map(|line| {
        let value = line.strip_prefix("title:")?.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
            .unwrap_or(value);
        (!value.is_empty()).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_simple_front_matter() {
        assert_eq!(strip_front_matter("---\na: b\n---\nBODY"), "BODY");
    }

    #[test]
    fn strips_empty_front_matter() {
        assert_eq!(strip_front_matter("---\n---\n\n# Doc\n"), "# Doc");
    }

    #[test]
    fn strips_crlf_front_matter() {
        assert_eq!(strip_front_matter("---\r\ndescription: x\r\n---\r\nBody"), "Body");
    }

    #[test]
    fn unterminated_front_matter_is_kept() {
        let input = "---\ntitle: broken\nno closing line\n";
        assert_eq!(strip_front_matter(input), input.trim());
    }

    #[test]
    fn no_front_matter_only_trims() {
        assert_eq!(strip_front_matter("\n\n# Title\n\nText\n"), "# Title\n\nText");
    }

    #[test]
    fn horizontal_rule_later_in_page_is_untouched() {
        let input = "Intro\n\n---\n\nMore";
        assert_eq!(strip_front_matter(input), input);
    }

    #[test]
    fn title_from_front_matter() {
        let md = "---\ntitle: \"Getting Started\"\n---\n# Other\n";
        assert_eq!(extract_title(md).as_deref(), Some("Getting Started"));
    }

    #[test]
    fn title_from_first_h1() {
        let md = "---\ndescription: x\n---\n\nIntro\n\n# Install\n\n# Later\n";
        assert_eq!(extract_title(md).as_deref(), Some("Install"));
    }

    #[test]
    fn title_missing() {
        assert_eq!(extract_title("just text\n## Sub"), None);
    }
}
