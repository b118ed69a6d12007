//! Crawler module driving the breadth-first citation walk
//!
//! This module contains the core crawling logic, including:
//! - The crawl engine and its per-step streaming merge
//! - Seed handling, including resuming from an existing database
//! - Paper filters
//! - The top-level `crawl` entry point wiring source, engine and sink

mod engine;
mod filter;

pub use engine::{CrawlEngine, CrawlSummary, Seeds, StepReport};
pub use filter::{AcceptAll, PaperFilter, YearFilter};

use crate::config::{require_seeds, Config, SinkKind};
use crate::sink::{GraphSink, Sink, SinkError, SqliteSink};
use crate::source::{PaperSource, RateLimiter, SemanticScholar};
use crate::WeaveError;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Builds the paper filter the configuration asks for
pub fn filter_from_config(config: &Config) -> Arc<dyn PaperFilter> {
    match config.crawl.min_year {
        Some(year) => Arc::new(YearFilter::new(year)),
        None => Arc::new(AcceptAll),
    }
}

/// Runs a complete crawl
///
/// This is the main entry point. It will:
/// 1. Create the process-wide rate limiter
/// 2. Build the Semantic Scholar source on top of the disk cache
/// 3. Open the configured sink
/// 4. Step the engine until the fixpoint or the step budget
/// 5. Finish the sink
pub async fn crawl(config: Config) -> Result<CrawlSummary, WeaveError> {
    require_seeds(&config.crawl)?;

    let limiter = Arc::new(RateLimiter::new(
        config.source.max_concurrent_requests,
        config.source.max_concurrent_files,
        Duration::from_millis(config.source.min_request_interval_ms),
    ));
    let source: Arc<dyn PaperSource> = Arc::new(SemanticScholar::from_config(&config, limiter)?);

    match config.output.sink {
        SinkKind::Sqlite => {
            let path = config.output.database_path.as_deref().unwrap_or_default();
            tracing::info!("Writing to SQLite database {}", path);
            let sink = SqliteSink::open(Path::new(path))?;
            let mut seeds = Seeds::from_config(&config.crawl);
            if config.crawl.from_store {
                seeds_from_store(&sink, &mut seeds)?;
            }
            run(&config, source, sink, seeds).await
        }
        SinkKind::Json => {
            let path = config.output.json_path.as_deref().unwrap_or_default();
            tracing::info!("Building in-memory graph, exported to {}", path);
            let seeds = Seeds::from_config(&config.crawl);
            run(&config, source, GraphSink::with_output(path), seeds).await
        }
    }
}

/// Adds every paper and author id already in the database to `seeds`
pub fn seeds_from_store(sink: &SqliteSink, seeds: &mut Seeds) -> Result<(), SinkError> {
    let paper_ids = sink.paper_ids()?;
    let author_ids = sink.author_ids()?;
    tracing::info!(
        "Resuming from store: {} papers, {} authors",
        paper_ids.len(),
        author_ids.len()
    );

    for id in paper_ids {
        if !seeds.paper_ids.contains(&id) {
            seeds.paper_ids.push(id);
        }
    }
    for id in author_ids {
        if !seeds.author_ids.contains(&id) {
            seeds.author_ids.push(id);
        }
    }
    Ok(())
}

async fn run<K: Sink>(
    config: &Config,
    source: Arc<dyn PaperSource>,
    sink: K,
    seeds: Seeds,
) -> Result<CrawlSummary, WeaveError> {
    let mut engine = CrawlEngine::new(source, sink)
        .with_filter(filter_from_config(config))
        .with_seeds(seeds);

    let summary = engine.run_to_fixpoint(config.crawl.max_steps).await;

    engine.sink_mut().finish()?;
    Ok(summary)
}
