use serde::Deserialize;
use std::collections::BTreeMap;

/// Main configuration structure for Citeweave
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    pub output: OutputConfig,
}

/// Remote bibliographic API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the graph API (without trailing slash)
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Maximum number of requests in flight at once
    #[serde(rename = "max-concurrent-requests", default = "default_max_requests")]
    pub max_concurrent_requests: usize,

    /// Maximum number of cache files open at once
    #[serde(rename = "max-concurrent-files", default = "default_max_files")]
    pub max_concurrent_files: usize,

    /// Minimum time between two outgoing requests (milliseconds)
    #[serde(rename = "min-request-interval-ms", default)]
    pub min_request_interval_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout")]
    pub timeout_secs: u64,

    /// Outbound proxy URL
    #[serde(default)]
    pub proxy: Option<String>,

    /// Extra headers sent with every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// On-disk response cache configuration
///
/// TTLs are in days; a negative value means the entry never expires.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_dir")]
    pub directory: String,

    #[serde(rename = "paper-ttl-days", default = "default_ttl_long")]
    pub paper_ttl_days: i64,

    #[serde(rename = "authors-ttl-days", default = "default_ttl_long")]
    pub authors_ttl_days: i64,

    #[serde(rename = "references-ttl-days", default = "default_ttl_long")]
    pub references_ttl_days: i64,

    #[serde(rename = "citations-ttl-days", default = "default_ttl_short")]
    pub citations_ttl_days: i64,

    #[serde(rename = "author-papers-ttl-days", default = "default_ttl_short")]
    pub author_papers_ttl_days: i64,

    #[serde(rename = "search-ttl-days", default = "default_ttl_never")]
    pub search_ttl_days: i64,
}

/// Crawl seeds and limits
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrawlConfig {
    /// Paper identifiers to start from
    #[serde(rename = "paper-ids", default)]
    pub paper_ids: Vec<String>,

    /// Author identifiers whose papers are added to the seeds
    #[serde(rename = "author-ids", default)]
    pub author_ids: Vec<String>,

    /// Paper titles resolved through title search
    #[serde(default)]
    pub titles: Vec<String>,

    /// Maximum number of BFS steps (unbounded when absent)
    #[serde(rename = "max-steps", default)]
    pub max_steps: Option<u32>,

    /// Papers published before this year are neither expanded nor written
    #[serde(rename = "min-year", default)]
    pub min_year: Option<i32>,

    /// Also seed from every paper and author id already in the database
    #[serde(rename = "from-store", default)]
    pub from_store: bool,
}

/// Which sink receives the crawl output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Sqlite,
    Json,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub sink: SinkKind,

    /// Path to the SQLite database file
    #[serde(rename = "database-path", default)]
    pub database_path: Option<String>,

    /// Path of the exported JSON graph
    #[serde(rename = "json-path", default)]
    pub json_path: Option<String>,
}

fn default_base_url() -> String {
    "https://api.semanticscholar.org/graph/v1".to_string()
}

fn default_max_requests() -> usize {
    8
}

fn default_max_files() -> usize {
    512
}

fn default_timeout() -> u64 {
    30
}

fn default_cache_dir() -> String {
    "save".to_string()
}

fn default_ttl_long() -> i64 {
    30
}

fn default_ttl_short() -> i64 {
    7
}

fn default_ttl_never() -> i64 {
    -1
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            max_concurrent_requests: default_max_requests(),
            max_concurrent_files: default_max_files(),
            min_request_interval_ms: 0,
            timeout_secs: default_timeout(),
            proxy: None,
            headers: BTreeMap::new(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: default_cache_dir(),
            paper_ttl_days: default_ttl_long(),
            authors_ttl_days: default_ttl_long(),
            references_ttl_days: default_ttl_long(),
            citations_ttl_days: default_ttl_short(),
            author_papers_ttl_days: default_ttl_short(),
            search_ttl_days: default_ttl_never(),
        }
    }
}
