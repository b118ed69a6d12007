//! TTL-aware disk cache in front of remote fetches
//!
//! Every remote response is stored as one JSON file under the cache root.
//! Entries older than their TTL (in days) are refetched, a negative TTL
//! never expires, and entries that no longer validate are deleted so the
//! next call starts clean.

use crate::source::RateLimiter;
use reqwest::Client;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Shape check applied to every cached or downloaded response
pub type Validator = fn(&Value) -> bool;

/// Outcome of looking a key up on disk
#[derive(Debug)]
enum CacheLookup {
    /// No file at this key
    Missing,

    /// File exists but is older than the TTL
    Stale,

    /// File exists but is not valid JSON
    Corrupt,

    /// Fresh, parsed content
    Hit(Value),
}

/// Disk-backed fetch cache sharing one process-wide limiter
pub struct FetchCache {
    client: Client,
    root: PathBuf,
    limiter: Arc<RateLimiter>,
}

impl FetchCache {
    /// Creates a cache rooted at `root`
    ///
    /// The directory is created lazily on first write.
    pub fn new(client: Client, root: impl Into<PathBuf>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            client,
            root: root.into(),
            limiter,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Fetches `url`, serving from the cache entry at `key` when possible
    ///
    /// # Arguments
    ///
    /// * `url` - Remote URL to GET on a cache miss
    /// * `key` - Relative cache path, e.g. `paper--1a2b3c/abc.json`
    /// * `ttl_days` - Maximum entry age in days; negative never expires
    /// * `validate` - Shape check for both cached and fresh content
    ///
    /// # Returns
    ///
    /// * `Some(Value)` - Valid content, cached or fresh
    /// * `None` - Nothing usable was obtained this attempt
    pub async fn fetch(
        &self,
        url: &str,
        key: &str,
        ttl_days: i64,
        validate: Validator,
    ) -> Option<Value> {
        let path = self.path_for(key);

        match self.lookup(&path, ttl_days).await {
            CacheLookup::Hit(value) => {
                if validate(&value) {
                    tracing::debug!("Cache hit: {} -> {}", key, url);
                    return Some(value);
                }
                tracing::warn!("Cached entry {} failed validation, removing", key);
                self.remove(&path).await;
            }
            CacheLookup::Corrupt => {
                tracing::warn!("Cached entry {} is not valid JSON, removing", key);
                self.remove(&path).await;
            }
            CacheLookup::Stale => {
                tracing::info!("Stale cache: {}", key);
            }
            CacheLookup::Missing => {}
        }

        let (text, value) = self.download(url).await?;

        if !validate(&value) {
            tracing::warn!("Response from {} failed validation", url);
            return None;
        }

        self.store(&path, &text).await;
        Some(value)
    }

    /// Reads the entry at `path` if it is younger than the TTL
    async fn lookup(&self, path: &Path, ttl_days: i64) -> CacheLookup {
        let Some(_permit) = self.limiter.acquire_file().await else {
            return CacheLookup::Missing;
        };

        let metadata = match tokio::fs::metadata(path).await {
            Ok(m) if m.is_file() => m,
            _ => return CacheLookup::Missing,
        };

        if ttl_days >= 0 {
            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| SystemTime::now().duration_since(modified).ok())
                .unwrap_or(Duration::ZERO);
            if age >= ttl_duration(ttl_days) {
                return CacheLookup::Stale;
            }
        }

        match tokio::fs::read_to_string(path).await {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(value) => CacheLookup::Hit(value),
                Err(_) => CacheLookup::Corrupt,
            },
            Err(e) => {
                tracing::debug!("No cache at {}: {}", path.display(), e);
                CacheLookup::Missing
            }
        }
    }

    /// Performs a paced, limited GET and parses the body as JSON
    async fn download(&self, url: &str) -> Option<(String, Value)> {
        let _permit = self.limiter.acquire_request().await?;
        self.limiter.pace().await;

        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Fetch error for {}: {}", url, e);
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("HTTP {} for {}", status.as_u16(), url);
            return None;
        }

        let text = match response.text().await {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!("Failed to read body of {}: {}", url, e);
                return None;
            }
        };

        match serde_json::from_str(&text) {
            Ok(value) => {
                tracing::info!("Downloaded: {}", url);
                Some((text, value))
            }
            Err(e) => {
                tracing::warn!("Malformed JSON from {}: {}", url, e);
                None
            }
        }
    }

    /// Writes a fresh entry, going through a temporary file
    async fn store(&self, path: &Path, text: &str) {
        let Some(_permit) = self.limiter.acquire_file().await else {
            return;
        };

        if let Some(parent) = path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                tracing::warn!("Cannot create cache directory {}: {}", parent.display(), e);
                return;
            }
        }

        let tmp = path.with_extension("json.tmp");
        let result = match tokio::fs::write(&tmp, text).await {
            Ok(()) => tokio::fs::rename(&tmp, path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::warn!("Failed to write cache {}: {}", path.display(), e);
            let _ = tokio::fs::remove_file(&tmp).await;
        }
    }

    async fn remove(&self, path: &Path) {
        let Some(_permit) = self.limiter.acquire_file().await else {
            return;
        };
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::debug!("Failed to remove {}: {}", path.display(), e);
        }
    }
}

/// Length of a non-negative TTL, saturating for absurdly large values
fn ttl_duration(ttl_days: i64) -> Duration {
    Duration::from_secs((ttl_days.max(0) as u64).saturating_mul(SECONDS_PER_DAY))
}
