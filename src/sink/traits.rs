//! Sink trait and error types

use crate::model::Paper;
use crate::reconcile::{AuthorWrite, ExistingAuthor};
use thiserror::Error;

/// Errors that can occur while writing to a sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Downstream store for papers, citation edges and author links
///
/// Every write must be idempotent: the engine is re-run until the graph
/// stabilises and the same paper or edge may arrive more than once across
/// runs. Papers are identified by title-hash.
pub trait Sink {
    /// Upserts a paper, merging newer fields into any stored record
    fn write_paper(&mut self, paper: &Paper) -> SinkResult<()>;

    /// Upserts the directed edge `citing -> cited` between two written papers
    fn write_reference(&mut self, citing: &Paper, cited: &Paper) -> SinkResult<()>;

    /// Author records the store already correlates with `paper`
    ///
    /// Includes authors linked to the paper itself plus any the store knows
    /// under the source ids or names of the paper's fresh authors. The result
    /// is deduplicated by the sink's own identity.
    fn correlated_authors(&self, paper: &Paper) -> SinkResult<Vec<ExistingAuthor>>;

    /// Applies one reconciliation instruction for `paper`
    ///
    /// If the instruction carries an unlink key, that author's link to the
    /// paper is removed before the write is applied and linked.
    fn write_author(&mut self, paper: &Paper, write: &AuthorWrite) -> SinkResult<()>;

    /// Called once after the crawl has finished
    fn finish(&mut self) -> SinkResult<()> {
        Ok(())
    }
}
