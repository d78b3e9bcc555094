//! Shared types, error model, and configuration for booksearch.
//!
//! This crate is the foundation depended on by all other booksearch crates.
//! It provides:
//! - [`BookSearchError`]: the unified error type
//! - Domain types ([`Page`], [`IndexedPage`], [`QueryResult`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, AssetsConfig, IndexConfig, SearchConfig, TransformConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, resolve_config,
};
pub use error::{BookSearchError, Result};
pub use types::{IndexedPage, Page, QueryResult};
