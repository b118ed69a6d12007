//! Semantic Scholar graph API source
//!
//! Every endpoint goes through the shared [`FetchCache`]. Cache keys embed a
//! short signature of the requested field list, so asking for different
//! fields lands in a different directory instead of reusing stale shapes.

use crate::config::{CacheConfig, Config};
use crate::model::{normalize_title, Author, Paper};
use crate::source::api::{self, AuthorRecord, EdgeRecord, Listing, PaperRecord};
use crate::source::{build_http_client, FetchCache, PaperSource, RateLimiter, Validator};
use crate::WeaveError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use url::Url;

const PAPER_FIELDS: &[&str] = &[
    "paperId",
    "title",
    "year",
    "publicationDate",
    "externalIds",
    "authors",
];
const EDGE_FIELDS: &[&str] = &["paperId", "title", "year", "publicationDate", "externalIds"];
const AUTHOR_FIELDS: &[&str] = &["authorId", "name", "externalIds"];
const BRIEF_FIELDS: &[&str] = &["paperId", "title"];

/// Largest page the API serves for references and citations
const EDGE_PAGE_LIMIT: &str = "1000";
const AUTHOR_PAPERS_LIMIT: &str = "100";

/// The remote endpoints, each with its own field set and TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Search,
    Paper,
    Authors,
    References,
    Citations,
    AuthorPapers,
}

impl Endpoint {
    fn name(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Paper => "paper",
            Self::Authors => "authors",
            Self::References => "references",
            Self::Citations => "citations",
            Self::AuthorPapers => "author-papers",
        }
    }

    fn fields(&self) -> &'static [&'static str] {
        match self {
            Self::Search | Self::AuthorPapers => BRIEF_FIELDS,
            Self::Paper => PAPER_FIELDS,
            Self::Authors => AUTHOR_FIELDS,
            Self::References | Self::Citations => EDGE_FIELDS,
        }
    }

    fn ttl_days(&self, ttl: &CacheConfig) -> i64 {
        match self {
            Self::Search => ttl.search_ttl_days,
            Self::Paper => ttl.paper_ttl_days,
            Self::Authors => ttl.authors_ttl_days,
            Self::References => ttl.references_ttl_days,
            Self::Citations => ttl.citations_ttl_days,
            Self::AuthorPapers => ttl.author_papers_ttl_days,
        }
    }

    fn validator(&self) -> Validator {
        match self {
            Self::Paper => api::is_paper,
            _ => api::is_listing,
        }
    }
}

/// Longest readable id prefix kept in a cache file name
const ID_PREFIX_LEN: usize = 40;

/// Short hex digest of `input`
fn digest(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())[..12].to_string()
}

/// Short digest of a field list
fn field_signature(fields: &[&str]) -> String {
    digest(&fields.join(","))
}

/// Readable, file-name safe prefix of an identifier
fn sanitize_id(id: &str) -> String {
    id.chars()
        .take(ID_PREFIX_LEN)
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Cache key of one (endpoint, field set, id) triple
///
/// The sanitized prefix is lossy, so the file stem also carries a digest of
/// the raw id.
fn cache_key(endpoint: Endpoint, id: &str) -> String {
    format!(
        "{}--{}/{}-{}.json",
        endpoint.name(),
        field_signature(endpoint.fields()),
        sanitize_id(id),
        digest(id)
    )
}

/// Paper source backed by the Semantic Scholar graph API
pub struct SemanticScholar {
    cache: FetchCache,
    base_url: String,
    ttl: CacheConfig,
}

impl SemanticScholar {
    pub fn new(cache: FetchCache, base_url: impl Into<String>, ttl: CacheConfig) -> Self {
        Self {
            cache,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ttl,
        }
    }

    /// Builds the source, its HTTP client and cache from configuration
    pub fn from_config(config: &Config, limiter: Arc<RateLimiter>) -> Result<Self, WeaveError> {
        let client = build_http_client(&config.source)?;
        let cache = FetchCache::new(client, &config.cache.directory, limiter);
        Ok(Self::new(
            cache,
            config.source.base_url.clone(),
            config.cache.clone(),
        ))
    }

    fn url(&self, path: &str, params: &[(&str, &str)]) -> Option<Url> {
        let raw = format!("{}{}", self.base_url, path);
        match Url::parse_with_params(&raw, params) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!("Cannot build URL from {}: {}", raw, e);
                None
            }
        }
    }

    /// Fetches and deserializes one endpoint for `id`
    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        id: &str,
        path: &str,
        extra: &[(&str, &str)],
    ) -> Option<T> {
        let fields = endpoint.fields().join(",");
        let mut params = vec![("fields", fields.as_str())];
        params.extend_from_slice(extra);
        let url = self.url(path, &params)?;

        let value = self
            .cache
            .fetch(
                url.as_str(),
                &cache_key(endpoint, id),
                endpoint.ttl_days(&self.ttl),
                endpoint.validator(),
            )
            .await?;

        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("Unexpected {} shape for {}: {}", endpoint.name(), id, e);
                None
            }
        }
    }

    async fn get_edges(&self, endpoint: Endpoint, id: &str) -> Option<Vec<Paper>> {
        let suffix = match endpoint {
            Endpoint::Citations => "citations",
            _ => "references",
        };
        let listing: Listing<EdgeRecord> = self
            .get(
                endpoint,
                id,
                &format!("/paper/{}/{}", id, suffix),
                &[("limit", EDGE_PAGE_LIMIT)],
            )
            .await?;

        Some(
            listing
                .data
                .into_iter()
                .filter_map(|edge| match endpoint {
                    Endpoint::Citations => edge.citing_paper,
                    _ => edge.cited_paper,
                })
                .filter_map(PaperRecord::into_paper)
                .collect(),
        )
    }
}

#[async_trait]
impl PaperSource for SemanticScholar {
    async fn search_by_title(&self, title: &str) -> Option<String> {
        let wanted = normalize_title(title);
        if wanted.is_empty() {
            return None;
        }

        let query = title.to_lowercase();
        let listing: Listing<PaperRecord> = self
            .get(
                Endpoint::Search,
                &wanted,
                "/paper/search",
                &[("query", query.as_str()), ("limit", "1")],
            )
            .await?;

        let best = listing.data.into_iter().next()?.into_paper()?;
        if normalize_title(&best.title) == wanted {
            Some(best.id)
        } else {
            tracing::info!("No exact title match for '{}' (best: '{}')", title, best.title);
            None
        }
    }

    async fn get_paper(&self, id: &str) -> Option<Paper> {
        let record: PaperRecord = self
            .get(Endpoint::Paper, id, &format!("/paper/{}", id), &[])
            .await?;
        record.into_paper()
    }

    async fn get_authors(&self, id: &str) -> Option<Vec<Author>> {
        let listing: Listing<AuthorRecord> = self
            .get(Endpoint::Authors, id, &format!("/paper/{}/authors", id), &[])
            .await?;
        Some(
            listing
                .data
                .into_iter()
                .map(AuthorRecord::into_author)
                .collect(),
        )
    }

    async fn get_references(&self, id: &str) -> Option<Vec<Paper>> {
        self.get_edges(Endpoint::References, id).await
    }

    async fn get_citations(&self, id: &str) -> Option<Vec<Paper>> {
        self.get_edges(Endpoint::Citations, id).await
    }

    async fn get_papers_by_author(&self, author_id: &str) -> Option<Vec<Paper>> {
        let listing: Listing<PaperRecord> = self
            .get(
                Endpoint::AuthorPapers,
                author_id,
                &format!("/author/{}/papers", author_id),
                &[("limit", AUTHOR_PAPERS_LIMIT)],
            )
            .await?;
        Some(
            listing
                .data
                .into_iter()
                .filter_map(PaperRecord::into_paper)
                .collect(),
        )
    }
}
