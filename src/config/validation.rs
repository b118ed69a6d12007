use crate::config::types::{CacheConfig, Config, CrawlConfig, OutputConfig, SinkKind, SourceConfig};
use crate::ConfigError;
use url::Url;

/// Upper bound for either concurrency limiter
const MAX_CONCURRENCY: usize = 1024;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_source_config(&config.source)?;
    validate_cache_config(&config.cache)?;
    validate_crawl_config(&config.crawl)?;
    validate_output_config(&config.output)?;

    if config.crawl.from_store && config.output.sink != SinkKind::Sqlite {
        return Err(ConfigError::Validation(
            "from-store needs the sqlite sink".to_string(),
        ));
    }
    Ok(())
}

/// Validates remote source configuration
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("max_concurrent_requests", config.max_concurrent_requests),
        ("max_concurrent_files", config.max_concurrent_files),
    ] {
        if value < 1 || value > MAX_CONCURRENCY {
            return Err(ConfigError::Validation(format!(
                "{} must be between 1 and {}, got {}",
                name, MAX_CONCURRENCY, value
            )));
        }
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must use http or https, got '{}'",
            config.base_url
        )));
    }

    if let Some(proxy) = &config.proxy {
        Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;
    }

    Ok(())
}

/// Validates cache configuration
fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "cache directory cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Checks that a crawl has somewhere to start
///
/// Kept apart from [`validate`] since command-line seeds are merged in after
/// the file is loaded.
pub fn require_seeds(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.paper_ids.is_empty()
        && config.author_ids.is_empty()
        && config.titles.is_empty()
        && !config.from_store
    {
        return Err(ConfigError::Validation(
            "at least one paper id, author id or title seed (or from-store) is required"
                .to_string(),
        ));
    }
    validate_crawl_config(config)
}

/// Validates crawl seeds
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config
        .paper_ids
        .iter()
        .chain(config.author_ids.iter())
        .any(|id| id.trim().is_empty())
    {
        return Err(ConfigError::Validation(
            "seed identifiers cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates that the chosen sink has somewhere to write
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    let (name, path) = match config.sink {
        SinkKind::Sqlite => ("database_path", &config.database_path),
        SinkKind::Json => ("json_path", &config.json_path),
    };

    match path {
        Some(p) if !p.is_empty() => Ok(()),
        _ => Err(ConfigError::Validation(format!(
            "{} is required for the {:?} sink",
            name, config.sink
        ))),
    }
}
