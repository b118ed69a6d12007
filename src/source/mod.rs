//! Remote paper sources
//!
//! This module contains everything that talks to the bibliographic API:
//! - The process-wide request limiter (concurrency and pacing)
//! - The TTL-aware disk cache every fetch goes through
//! - HTTP client construction
//! - The `PaperSource` capability and its Semantic Scholar implementation
//!
//! A fetch that yields nothing usable returns `None`. That is never an
//! error: the caller treats the paper or author as not-yet-available.

pub mod api;
mod cache;
mod client;
mod limiter;
mod semantic_scholar;

pub use cache::{FetchCache, Validator};
pub use client::{build_http_client, USER_AGENT};
pub use limiter::RateLimiter;
pub use semantic_scholar::SemanticScholar;

use crate::model::{Author, Paper};
use async_trait::async_trait;

/// Typed read access to a bibliographic source
#[async_trait]
pub trait PaperSource: Send + Sync {
    /// Resolves a title to a paper id, only on an exact normalized match
    async fn search_by_title(&self, title: &str) -> Option<String>;

    /// Fetches a paper's metadata, including its embedded author list
    async fn get_paper(&self, id: &str) -> Option<Paper>;

    /// Fetches the full author records of a paper
    async fn get_authors(&self, id: &str) -> Option<Vec<Author>>;

    /// Papers cited by `id`
    async fn get_references(&self, id: &str) -> Option<Vec<Paper>>;

    /// Papers citing `id`
    async fn get_citations(&self, id: &str) -> Option<Vec<Paper>>;

    async fn get_papers_by_author(&self, author_id: &str) -> Option<Vec<Paper>>;
}
