//! Sinks receiving the crawl output
//!
//! This module contains:
//! - The `Sink` contract the crawl engine writes through
//! - A SQLite sink for persistent graphs across runs
//! - An in-memory graph sink exported as JSON
//! - Statistics over a stored graph

mod graph;
mod schema;
mod sqlite;
mod stats;
mod traits;

pub use graph::{AuthorNode, GraphSink};
pub use sqlite::SqliteSink;
pub use stats::{print_statistics, SinkStatistics};
pub use traits::{Sink, SinkError, SinkResult};
