use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "CITEWEAVE_";

/// Loads, applies environment overrides to, and validates a configuration file
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use citeweave::config::load_config;
///
/// let config = load_config(Path::new("citeweave.toml")).unwrap();
/// println!("Cache directory: {}", config.cache.directory);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&content)?;

    apply_overrides(&mut config, |key| std::env::var(key).ok());

    validate(&config)?;

    Ok(config)
}

/// Applies `CITEWEAVE_*` overrides on top of the file configuration
///
/// `lookup` maps a full variable name to its value. Integer overrides that
/// fail to parse are ignored.
pub fn apply_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));
    let get_int = |name: &str| get(name).and_then(|v| v.trim().parse::<i64>().ok());

    if let Some(v) = get_int("MAX_CONCURRENT_REQUESTS") {
        if v > 0 {
            config.source.max_concurrent_requests = v as usize;
        }
    }
    if let Some(v) = get_int("MIN_REQUEST_INTERVAL_MS") {
        if v >= 0 {
            config.source.min_request_interval_ms = v as u64;
        }
    }
    if let Some(v) = get_int("TIMEOUT_SECS") {
        if v > 0 {
            config.source.timeout_secs = v as u64;
        }
    }
    if let Some(proxy) = get("PROXY") {
        config.source.proxy = Some(proxy);
    }
    if let Some(key) = get("API_KEY") {
        config.source.headers.insert("x-api-key".to_string(), key);
    }
    if let Some(dir) = get("CACHE_DIR") {
        config.cache.directory = dir;
    }

    let cache = &mut config.cache;
    for (name, slot) in [
        ("TTL_PAPER", &mut cache.paper_ttl_days),
        ("TTL_AUTHORS", &mut cache.authors_ttl_days),
        ("TTL_REFERENCES", &mut cache.references_ttl_days),
        ("TTL_CITATIONS", &mut cache.citations_ttl_days),
        ("TTL_AUTHOR_PAPERS", &mut cache.author_papers_ttl_days),
        ("TTL_SEARCH", &mut cache.search_ttl_days),
    ] {
        if let Some(v) = get_int(name) {
            *slot = v;
        }
    }
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at start-up so two runs can be told apart in the logs.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
