//! Configuration module for Citeweave
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, with `CITEWEAVE_*` environment variables layered on top.
//!
//! # Example
//!
//! ```no_run
//! use citeweave::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("citeweave.toml")).unwrap();
//! println!("Requests in flight: {}", config.source.max_concurrent_requests);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{CacheConfig, Config, CrawlConfig, OutputConfig, SinkKind, SourceConfig};

// Re-export parser functions
pub use parser::{apply_overrides, compute_config_hash, load_config, load_config_with_hash};

pub use validation::{require_seeds, validate};
