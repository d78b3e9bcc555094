//! Shorthand transpiler for proprietary markdown extensions.
//!
//! Rewrites `{% embed %}`, `{% content-ref %}`, `{% stepper %}`, `{% tabs %}`,
//! `{% columns %}` and friends into portable markdown/HTML. The rewrite is an
//! explicit ordered pipeline of named stages; later stages consume the shape
//! produced by earlier ones, so the order in [`default_stages`] is fixed.

mod blocks;
mod braces;
mod frontmatter;

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument, warn};

use booksearch_shared::{BookSearchError, Result, TransformConfig};

pub use blocks::format_text;
pub use frontmatter::{extract_title, strip_front_matter};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Per-page information available to every stage.
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    /// Page identifier as given by the host.
    pub path: &'a str,
    /// Whether this page is listed in `script_escape_pages`.
    pub escape_scripts: bool,
}

/// Signature shared by all stages.
pub type StageFn = fn(&str, &PageContext<'_>) -> Result<String>;

/// A named step of the transpiler pipeline.
#[derive(Clone, Copy)]
pub struct Stage {
    /// Stable name used in logs and errors.
    pub name: &'static str,
    /// Block tag this stage consumes. The stage may remove these openings but
    /// must never add new ones.
    pub consumes: Option<&'static str>,
    pub apply: StageFn,
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("consumes", &self.consumes)
            .finish()
    }
}

/// A stage that failed; the page keeps the output of the stages before it.
#[derive(Debug)]
pub struct StageFailure {
    pub stage: &'static str,
    pub error: BookSearchError,
}

/// Result of running the pipeline on one page.
#[derive(Debug)]
pub struct TranspileOutcome {
    /// Transformed content (partial when `failure` is set).
    pub content: String,
    pub failure: Option<StageFailure>,
}

impl TranspileOutcome {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// The stages in application order.
///
/// Running the chain twice over its own output is not idempotent: brace
/// escaping, for instance, will wrap already-wrapped code spans again.
pub fn default_stages() -> Vec<Stage> {
    vec![
        Stage {
            name: "embed",
            consumes: Some("embed"),
            apply: braces::normalize_embeds,
        },
        Stage {
            name: "escape-braces",
            consumes: None,
            apply: braces::escape_braces,
        },
        Stage {
            name: "unwrap-escaped",
            consumes: None,
            apply: braces::unwrap_escaped,
        },
        Stage {
            name: "content-ref",
            consumes: Some("content-ref"),
            apply: blocks::expand_content_refs,
        },
        Stage {
            name: "stepper",
            consumes: Some("stepper"),
            apply: blocks::expand_steppers,
        },
        Stage {
            name: "tabs",
            consumes: Some("tabs"),
            apply: blocks::expand_tabs,
        },
        Stage {
            name: "columns",
            consumes: Some("columns"),
            apply: blocks::expand_columns,
        },
        Stage {
            name: "script-escape",
            consumes: None,
            apply: braces::escape_script_delimiters,
        },
        Stage {
            name: "formatted-code",
            consumes: Some("formatted-code"),
            apply: blocks::expand_formatted_code,
        },
    ]
}

/// Ordered shorthand rewriter, configured once per build.
#[derive(Debug, Clone)]
pub struct Transpiler {
    stages: Vec<Stage>,
    script_escape_pages: BTreeSet<String>,
}

impl Transpiler {
    pub fn new(config: &TransformConfig) -> Self {
        Self::with_stages(default_stages(), config)
    }

    /// Build a transpiler from an explicit stage list.
    pub fn with_stages(stages: Vec<Stage>, config: &TransformConfig) -> Self {
        Self {
            stages,
            script_escape_pages: config.script_escape_pages.clone(),
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Run every stage over `content`.
    ///
    /// Never fails: the first stage that errors (or breaks its block-balance
    /// postcondition) is logged, and the content produced so far is returned.
    #[instrument(skip(self, content), fields(len = content.len()))]
    pub fn run(&self, path: &str, content: &str) -> TranspileOutcome {
        let ctx = PageContext {
            path,
            escape_scripts: self.script_escape_pages.contains(path),
        };

        let mut current = content.to_string();

        for stage in &self.stages {
            match apply_checked(stage, &current, &ctx) {
                Ok(next) => {
                    if next.len() != current.len() {
                        debug!(stage = stage.name, before = current.len(), after = next.len(), "stage rewrote content");
                    }
                    current = next;
                }
                Err(error) => {
                    warn!(stage = stage.name, path, error = %error, "transform stage failed, keeping partial output");
                    return TranspileOutcome {
                        content: current,
                        failure: Some(StageFailure {
                            stage: stage.name,
                            error,
                        }),
                    };
                }
            }
        }

        TranspileOutcome {
            content: current,
            failure: None,
        }
    }
}

/// Transform one page with the default stages.
pub fn transform(path: &str, content: &str, config: &TransformConfig) -> TranspileOutcome {
    Transpiler::new(config).run(path, content)
}

fn apply_checked(stage: &Stage, input: &str, ctx: &PageContext<'_>) -> Result<String> {
    let output = (stage.apply)(input, ctx)?;

    if let Some(tag) = stage.consumes {
        let before = count_openings(input, tag);
        let after = count_openings(&output, tag);
        if after > before {
            return Err(BookSearchError::transform(
                stage.name,
                format!("`{{% {tag} %}}` openings grew from {before} to {after}"),
            ));
        }
    }

    Ok(output)
}

/// Count `{% tag ... %}` openings (not `{% endtag %}`).
fn count_openings(md: &str, tag: &str) -> usize {
    static OPEN_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\{%-?\s*([A-Za-z][\w-]*)").expect("valid regex")
    });

    OPEN_RE
        .captures_iter(md)
        .filter(|caps| &caps[1] == tag)
        .count()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn config_escaping(path: &str) -> TransformConfig {
        let mut config = TransformConfig::default();
        config.script_escape_pages.insert(path.to_string());
        config
    }

    #[test]
    fn stages_run_in_documented_order() {
        let names: Vec<_> = default_stages().iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            [
                "embed",
                "escape-braces",
                "unwrap-escaped",
                "content-ref",
                "stepper",
                "tabs",
                "columns",
                "script-escape",
                "formatted-code",
            ]
        );
    }

    #[test]
    fn tabs_end_to_end() {
        let input = r#"{% tabs %}{% tab title="A" %}x{% endtab %}{% tab title="B" %}y{% endtab %}{% endtabs %}"#;
        let out = transform("page.md", input, &TransformConfig::default());

        assert!(out.is_complete());
        let a = out.content.find("<summary>A</summary>").expect("tab A");
        let b = out.content.find("<summary>B</summary>").expect("tab B");
        assert!(a < b);
        assert!(out.content.contains("<summary>A</summary>\n\nx\n\n</details>"));
        assert!(out.content.contains("<summary>B</summary>\n\ny\n\n</details>"));
    }

    #[test]
    fn word_braces_surface_as_code_spans() {
        let out = transform("p.md", "Hello {{name}} and {{ other }}", &TransformConfig::default());
        assert!(out.content.contains("`{{name}}`"));
        assert!(!out.content.replace("`{{name}}`", "").contains("{{name}}"));
        // Non-word expressions are left to the host template engine.
        assert!(out.content.contains("{{ other }}"));
    }

    #[test]
    fn embed_then_other_blocks_compose() {
        let input = "{% embed url=\"https://youtu.be/x\" %}\n\n{% stepper %}{% step %}\n#### Install\nRun it.\n{% endstep %}{% endstepper %}";
        let out = transform("p.md", input, &TransformConfig::default());
        assert!(out.content.contains("{% urlembed %}\nhttps://youtu.be/x\n{% endurlembed %}"));
        assert!(out.content.contains("## Step 1: Install\nRun it."));
    }

    #[test]
    fn script_escape_only_for_configured_pages() {
        let input = "<script>var x = '{% if a %}';</script>";
        let config = config_escaping("theme/banner.md");

        let escaped = transform("theme/banner.md", input, &config);
        assert!(escaped.content.contains("&#123;% if a %&#125;"));

        let untouched = transform("other.md", input, &config);
        assert_eq!(untouched.content, input);
    }

    fn failing_stage(_: &str, _: &PageContext<'_>) -> Result<String> {
        Err(BookSearchError::transform("boom", "synthetic failure"))
    }

    fn add_marker(md: &str, _: &PageContext<'_>) -> Result<String> {
        Ok(format!("{md}\n{{% tabs %}}"))
    }

    #[test]
    fn failing_stage_keeps_partial_output() {
        let mut stages = default_stages();
        // Fail right after the brace stages.
        stages.insert(3, Stage {
            name: "boom",
            consumes: None,
            apply: failing_stage,
        });
        let transpiler = Transpiler::with_stages(stages, &TransformConfig::default());

        let input = "{{name}}\n{% tabs %}{% tab title=\"A\" %}x{% endtab %}{% endtabs %}";
        let out = transpiler.run("p.md", input);

        let failure = out.failure.as_ref().expect("failure recorded");
        assert_eq!(failure.stage, "boom");
        // Brace stages ran, tabs did not.
        assert!(out.content.contains("`{{name}}`"));
        assert!(out.content.contains("{% tabs %}"));
    }

    #[test]
    fn postcondition_rejects_new_openings() {
        let stages = vec![Stage {
            name: "bad-tabs",
            consumes: Some("tabs"),
            apply: add_marker,
        }];
        let transpiler = Transpiler::with_stages(stages, &TransformConfig::default());
        let out = transpiler.run("p.md", "text");

        assert_eq!(out.content, "text");
        assert!(out.failure.unwrap().error.to_string().contains("openings grew"));
    }

    #[test]
    fn count_openings_ignores_end_tags() {
        let md = "{% tabs %}{% tab title=\"a\" %}{% endtab %}{% endtabs %}{%- tabs -%}";
        assert_eq!(count_openings(md, "tabs"), 2);
        assert_eq!(count_openings(md, "tab"), 1);
    }

    #[test]
    fn plain_markdown_passes_through() {
        let input = "# Title\n\nJust text with `code` and a [link](a.md).";
        let out = transform("p.md", input, &TransformConfig::default());
        assert_eq!(out.content, input);
    }
}
