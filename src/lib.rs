//! Citeweave: an incremental citation graph crawler
//!
//! This crate walks a bibliographic API breadth-first from seed papers and
//! authors, caching every response on disk, and streams papers, citation
//! edges and reconciled author links into a graph sink.

pub mod config;
pub mod crawler;
pub mod model;
pub mod reconcile;
pub mod sink;
pub mod source;
pub mod state;

use thiserror::Error;

/// Main error type for Citeweave operations
#[derive(Debug, Error)]
pub enum WeaveError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Sink error: {0}")]
    Sink(#[from] sink::SinkError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid header {name}: {message}")]
    InvalidHeader { name: String, message: String },

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Citeweave operations
pub type Result<T> = std::result::Result<T, WeaveError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlEngine, StepReport};
pub use model::{title_hash, Author, Paper};
pub use reconcile::{AuthorKey, AuthorReconciler, AuthorWrite, ExistingAuthor};
pub use sink::{GraphSink, Sink, SqliteSink};
pub use source::{FetchCache, PaperSource, RateLimiter, SemanticScholar};
