//! Wire types of the bibliographic graph API
//!
//! Responses are deserialized leniently: every field is optional, and
//! records missing what the crawler needs are dropped during conversion.

use crate::model::{Author, Paper};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// A paper object as embedded in any response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaperRecord {
    #[serde(rename = "paperId", default)]
    pub paper_id: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub year: Option<i32>,

    #[serde(rename = "publicationDate", default)]
    pub publication_date: Option<String>,

    #[serde(rename = "externalIds", default)]
    pub external_ids: Option<BTreeMap<String, Value>>,

    #[serde(default)]
    pub authors: Option<Vec<AuthorRecord>>,
}

/// An author object
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorRecord {
    #[serde(rename = "authorId", default)]
    pub author_id: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(rename = "externalIds", default)]
    pub external_ids: Option<BTreeMap<String, Value>>,
}

/// One entry of a references or citations listing
#[derive(Debug, Deserialize)]
pub struct EdgeRecord {
    #[serde(rename = "citedPaper", default)]
    pub cited_paper: Option<PaperRecord>,

    #[serde(rename = "citingPaper", default)]
    pub citing_paper: Option<PaperRecord>,
}

/// Any `{"data": [...]}` listing
#[derive(Debug, Deserialize)]
pub struct Listing<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// Flattens an external-id value into strings
///
/// The API mixes strings (`"DOI"`), integers (`"CorpusId"`) and arrays
/// (`"DBLP"` for authors).
fn flatten_external(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Number(n) => vec![n.to_string()],
        Value::Array(items) => items.iter().flat_map(flatten_external).collect(),
        _ => Vec::new(),
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(e) => {
            tracing::warn!("Cannot parse date {}: {}", raw, e);
            None
        }
    }
}

impl PaperRecord {
    /// Converts to a [`Paper`]; records without an id or title are dropped
    pub fn into_paper(self) -> Option<Paper> {
        let id = self.paper_id.filter(|id| !id.is_empty())?;
        let title = self.title.filter(|t| !t.trim().is_empty())?;

        let external_ids = self
            .external_ids
            .unwrap_or_default()
            .iter()
            .filter_map(|(k, v)| flatten_external(v).into_iter().next().map(|v| (k.clone(), v)))
            .collect();

        Some(Paper {
            id,
            title,
            year: self.year,
            date: self.publication_date.as_deref().and_then(parse_date),
            external_ids,
            authors: self
                .authors
                .map(|authors| authors.into_iter().map(AuthorRecord::into_author).collect()),
        })
    }
}

impl AuthorRecord {
    pub fn into_author(self) -> Author {
        let external_ids = self
            .external_ids
            .unwrap_or_default()
            .iter()
            .map(|(k, v)| (k.clone(), flatten_external(v)))
            .filter(|(_, v)| !v.is_empty())
            .collect();

        Author {
            id: self.author_id.filter(|id| !id.is_empty()),
            name: self.name,
            external_ids,
        }
    }
}

/// Validator: a paper detail object with an id and title
pub fn is_paper(value: &Value) -> bool {
    value.get("paperId").map_or(false, Value::is_string)
        && value.get("title").map_or(false, Value::is_string)
}

/// Validator: a `{"data": [...]}` listing
pub fn is_listing(value: &Value) -> bool {
    value.get("data").map_or(false, Value::is_array)
}
