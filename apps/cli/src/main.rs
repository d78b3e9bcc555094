//! booksearch CLI: reference host for the shorthand transpiler and the
//! client-side search index.
//!
//! Runs a markdown tree through the build hooks, exports the search artifact
//! and queries it the way the browser widget does.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
