//! Paper records and the title-hash identity key

use crate::model::Author;
use chrono::NaiveDate;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Normalizes a title down to lowercase alphanumerics
///
/// Whitespace, punctuation and case differences all disappear, so
/// `"Deep Learning"` and `"  deep   learning "` normalize identically.
pub fn normalize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Computes the title-hash of a paper title
///
/// This is the idempotency key used by sinks that cannot rely on the
/// source-assigned id: a hex SHA-256 digest of the normalized title.
pub fn title_hash(title: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_title(title).as_bytes());
    hex::encode(hasher.finalize())
}

/// A paper as known to the crawler
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Paper {
    /// Source-assigned identifier
    #[serde(rename = "paperId")]
    pub id: String,

    pub title: String,

    pub year: Option<i32>,

    /// Full publication date, when the source knows it
    pub date: Option<NaiveDate>,

    /// Identifiers in other bibliographic systems (DOI, DBLP, ArXiv, ...)
    #[serde(rename = "externalIds", skip_serializing_if = "BTreeMap::is_empty")]
    pub external_ids: BTreeMap<String, String>,

    /// Authors, resolved at most once per process
    #[serde(skip)]
    pub authors: Option<Vec<Author>>,
}

impl Paper {
    /// Creates a paper with only an id and a title
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn title_hash(&self) -> String {
        title_hash(&self.title)
    }

    pub fn doi(&self) -> Option<&str> {
        self.external_ids.get("DOI").map(String::as_str)
    }

    /// Key of the paper in DBLP, if the source links one
    pub fn dblp_key(&self) -> Option<&str> {
        self.external_ids.get("DBLP").map(String::as_str)
    }

    /// Merges newer field data into this record
    ///
    /// Present fields in `newer` overwrite, absent ones never erase. The id
    /// is immutable once assigned.
    pub fn merge(&mut self, newer: Paper) {
        if self.id.is_empty() {
            self.id = newer.id;
        }
        if !newer.title.is_empty() {
            self.title = newer.title;
        }
        if newer.year.is_some() {
            self.year = newer.year;
        }
        if newer.date.is_some() {
            self.date = newer.date;
        }
        self.external_ids.extend(newer.external_ids);
        if self.authors.is_none() {
            self.authors = newer.authors;
        }
    }
}
