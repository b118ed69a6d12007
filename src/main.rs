//! Citeweave main entry point
//!
//! This is the command-line interface for the Citeweave citation crawler.

use anyhow::{bail, Context};
use citeweave::config::{load_config_with_hash, Config, SinkKind};
use citeweave::crawler::crawl;
use citeweave::sink::{print_statistics, SqliteSink};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Citeweave: an incremental citation graph crawler
///
/// Citeweave walks a bibliographic API breadth-first from seed papers and
/// authors, caches every response on disk, and merges papers, citations
/// and reconciled author links into a graph store. Re-running it extends
/// the graph instead of rebuilding it.
#[derive(Parser, Debug)]
#[command(name = "citeweave")]
#[command(version)]
#[command(about = "An incremental citation graph crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Extra seed paper id (repeatable)
    #[arg(short = 'p', long = "pid", value_name = "PAPER_ID")]
    paper_ids: Vec<String>,

    /// Extra seed author id (repeatable)
    #[arg(short = 'a', long = "aid", value_name = "AUTHOR_ID")]
    author_ids: Vec<String>,

    /// Also seed from every paper and author already in the database
    #[arg(long)]
    from_store: bool,

    /// Maximum number of breadth-first steps
    #[arg(short = 'l', long = "limit", value_name = "STEPS")]
    limit: Option<u32>,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    config.crawl.paper_ids.extend(cli.paper_ids);
    config.crawl.author_ids.extend(cli.author_ids);
    config.crawl.from_store |= cli.from_store;
    if cli.limit.is_some() {
        config.crawl.max_steps = cli.limit;
    }

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("citeweave=info,warn"),
            1 => EnvFilter::new("citeweave=debug,info"),
            2 => EnvFilter::new("citeweave=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Citeweave Dry Run ===\n");

    println!("Source:");
    println!("  Base URL: {}", config.source.base_url);
    println!(
        "  Max concurrent requests: {}",
        config.source.max_concurrent_requests
    );
    println!(
        "  Min request interval: {}ms",
        config.source.min_request_interval_ms
    );
    println!("  Timeout: {}s", config.source.timeout_secs);
    if let Some(proxy) = &config.source.proxy {
        println!("  Proxy: {}", proxy);
    }
    for name in config.source.headers.keys() {
        println!("  Header: {}", name);
    }

    println!("\nCache ({}):", config.cache.directory);
    println!("  Paper TTL: {} days", config.cache.paper_ttl_days);
    println!("  Authors TTL: {} days", config.cache.authors_ttl_days);
    println!("  References TTL: {} days", config.cache.references_ttl_days);
    println!("  Citations TTL: {} days", config.cache.citations_ttl_days);
    println!(
        "  Author papers TTL: {} days",
        config.cache.author_papers_ttl_days
    );
    println!("  Search TTL: {} days", config.cache.search_ttl_days);

    println!("\nCrawl:");
    match config.crawl.max_steps {
        Some(steps) => println!("  Max steps: {}", steps),
        None => println!("  Max steps: unbounded"),
    }
    if let Some(year) = config.crawl.min_year {
        println!("  Min year: {}", year);
    }
    if config.crawl.from_store {
        println!("  Resume from store: yes");
    }
    println!("  Paper seeds ({}):", config.crawl.paper_ids.len());
    for id in &config.crawl.paper_ids {
        println!("    * {}", id);
    }
    println!("  Author seeds ({}):", config.crawl.author_ids.len());
    for id in &config.crawl.author_ids {
        println!("    * {}", id);
    }
    println!("  Title seeds ({}):", config.crawl.titles.len());
    for title in &config.crawl.titles {
        println!("    * {}", title);
    }

    println!("\nOutput:");
    match config.output.sink {
        SinkKind::Sqlite => println!(
            "  SQLite: {}",
            config.output.database_path.as_deref().unwrap_or("-")
        ),
        SinkKind::Json => println!(
            "  JSON: {}",
            config.output.json_path.as_deref().unwrap_or("-")
        ),
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let Some(path) = config.output.database_path.as_deref() else {
        bail!("--stats needs output.database-path");
    };
    println!("Database: {}\n", path);

    let sink = SqliteSink::open(Path::new(path))
        .with_context(|| format!("Failed to open {}", path))?;
    print_statistics(&sink.statistics()?);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Seeds: {} papers, {} authors, {} titles{}",
        config.crawl.paper_ids.len(),
        config.crawl.author_ids.len(),
        config.crawl.titles.len(),
        if config.crawl.from_store { ", plus the store" } else { "" }
    );

    match crawl(config).await {
        Ok(summary) => {
            tracing::info!(
                "Crawl completed after {} steps: {} papers and {} edges written",
                summary.steps,
                summary.totals.papers_written,
                summary.totals.edges_written
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
