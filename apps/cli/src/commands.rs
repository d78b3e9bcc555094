//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::time::Instant;

use booksearch_core::{BuildHooks, BuildSession, copy_assets};
use booksearch_markdown::{extract_title, transform};
use booksearch_search::{
    ArtifactSource, FileArtifactSource, HttpArtifactSource, SearchWidget, WidgetState,
};
use booksearch_shared::{AppConfig, Page, config_dir, init_config, resolve_config};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use url::Url;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// booksearch: markdown shorthand transform and static-site search index.
#[derive(Parser)]
#[command(
    name = "booksearch",
    version,
    about = "Transform markdown shorthand, export a search index and query it.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ./booksearch.toml, then ~/.booksearch/booksearch.toml).
    #[arg(long, global = true, env = "BOOKSEARCH_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Transform a markdown tree and export its search index.
    Build {
        /// Source directory scanned recursively for `*.md` files.
        src: PathBuf,

        /// Output root for transformed pages and the assets directory.
        #[arg(short, long)]
        out: PathBuf,

        /// Directory holding the configured stylesheets and scripts.
        #[arg(long)]
        assets: Option<PathBuf>,
    },

    /// Print the transformed content of a single page.
    Transform {
        /// Markdown file to transform.
        file: PathBuf,

        /// Page identifier (defaults to the file path as given).
        #[arg(long)]
        path: Option<String>,
    },

    /// Query a search artifact the way the page widget does.
    Search {
        /// Artifact file or http(s) URL.
        artifact: String,

        /// Query text.
        query: String,

        /// Maximum hits per field (defaults to `search.result_limit`).
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a default config file.
    Init {
        /// Target directory (defaults to ~/.booksearch).
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "booksearch=info",
        1 => "booksearch=debug",
        _ => "booksearch=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Build { src, out, assets } => {
            let config = resolve_config(config_path)?;
            cmd_build(config, &src, &out, assets.as_deref())
        }
        Command::Transform { file, path } => {
            let config = resolve_config(config_path)?;
            cmd_transform(&config, &file, path.as_deref())
        }
        Command::Search {
            artifact,
            query,
            limit,
        } => {
            let config = resolve_config(config_path)?;
            cmd_search(config, &artifact, &query, limit).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init { dir } => cmd_config_init(dir),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

// ---------------------------------------------------------------------------
// build
// ---------------------------------------------------------------------------

fn cmd_build(config: AppConfig, src: &Path, out: &Path, assets: Option<&Path>) -> Result<()> {
    if !src.is_dir() {
        return Err(eyre!("source '{}' is not a directory", src.display()));
    }

    let started = Instant::now();
    let files = collect_markdown(src)?;
    info!(src = %src.display(), files = files.len(), "building");

    let progress = CliProgress::new(files.len() as u64)?;
    let mut session = BuildSession::new(config);
    session.on_build_init();

    for file in &files {
        let id = page_id(src, file);
        progress.page(&id);

        let content = std::fs::read_to_string(file)
            .map_err(|e| eyre!("cannot read {}: {e}", file.display()))?;
        let title = extract_title(&content).unwrap_or_else(|| file_stem(file));

        let page = session.on_before_page_render(Page::new(id.as_str(), title, content));

        let target = out.join(&id);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| eyre!("cannot create {}: {e}", parent.display()))?;
        }
        std::fs::write(&target, &page.content)
            .map_err(|e| eyre!("cannot write {}: {e}", target.display()))?;
    }

    if let Some(dir) = assets {
        let copied = copy_assets(dir, out, &session.config().assets)?;
        info!(count = copied.len(), "assets copied");
    }

    let report = session.on_build_finish(out)?;
    progress.done();

    println!();
    println!("  Search index built.");
    println!("  Pages:    {}", report.page_count);
    if session.partial_pages() > 0 {
        println!("  Partial:  {}", session.partial_pages());
    }
    println!("  Artifact: {}", report.path.display());
    println!("  Size:     {} bytes", report.size_bytes);
    println!("  SHA-256:  {}", report.sha256);
    println!("  Time:     {:.1}s", started.elapsed().as_secs_f64());
    println!();

    Ok(())
}

/// All `*.md` files under `root`, sorted for a stable page order.
fn collect_markdown(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries =
            std::fs::read_dir(&dir).map_err(|e| eyre!("cannot read {}: {e}", dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "md") {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Page identifier: path relative to the source root, `/`-separated.
fn page_id(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn file_stem(file: &Path) -> String {
    file.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Page progress bar using indicatif.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new(total: u64) -> Result<Self> {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{pos}/{len}] {wide_msg}")?
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        Ok(Self { bar })
    }

    fn page(&self, path: &str) {
        self.bar.set_message(format!("Transforming {path}"));
        self.bar.inc(1);
    }

    fn done(&self) {
        self.bar.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// transform
// ---------------------------------------------------------------------------

fn cmd_transform(config: &AppConfig, file: &Path, path: Option<&str>) -> Result<()> {
    let content =
        std::fs::read_to_string(file).map_err(|e| eyre!("cannot read {}: {e}", file.display()))?;
    let id = path
        .map(String::from)
        .unwrap_or_else(|| file.to_string_lossy().into_owned());

    let outcome = transform(&id, &content, &config.transform);
    if let Some(failure) = &outcome.failure {
        warn!(stage = failure.stage, error = %failure.error, "transform stopped early");
    }

    print!("{}", outcome.content);
    Ok(())
}

// ---------------------------------------------------------------------------
// search
// ---------------------------------------------------------------------------

async fn cmd_search(
    mut config: AppConfig,
    artifact: &str,
    query: &str,
    limit: Option<usize>,
) -> Result<()> {
    if let Some(limit) = limit {
        config.search.result_limit = limit;
    }

    if artifact.starts_with("http://") || artifact.starts_with("https://") {
        let url = Url::parse(artifact).map_err(|e| eyre!("invalid URL '{artifact}': {e}"))?;
        let source = HttpArtifactSource::new(url)?;
        run_query(config, &source, query).await
    } else {
        let source = FileArtifactSource::new(artifact);
        run_query(config, &source, query).await
    }
}

async fn run_query<S: ArtifactSource>(config: AppConfig, source: &S, query: &str) -> Result<()> {
    let debounce = std::time::Duration::from_millis(config.search.debounce_ms);
    let mut widget = SearchWidget::new(config.search, "/index.html");
    widget.init(source).await;

    match widget.state() {
        WidgetState::Disabled => return Err(eyre!("search is disabled, check `search.tokenize`")),
        _ if !widget.is_index_ready() => {
            return Err(eyre!("could not load search index from {}", source.describe()));
        }
        _ => {}
    }

    let now = Instant::now();
    widget.on_input(query, now);
    widget.poll(now + debounce);

    let results = widget.results();
    if results.is_empty() {
        println!("No results found");
        return Ok(());
    }

    for item in results {
        println!("{}\t{}", item.title, item.path);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config_init(dir: Option<PathBuf>) -> Result<()> {
    let dir = match dir {
        Some(dir) => dir,
        None => config_dir()?,
    };
    let path = init_config(&dir)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(explicit: Option<&Path>) -> Result<()> {
    let config = resolve_config(explicit)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
