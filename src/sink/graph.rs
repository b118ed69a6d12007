//! In-memory graph sink
//!
//! Keeps papers keyed by title hash and exports the whole graph as one JSON
//! document when the crawl finishes.

use crate::model::{normalize_name, Paper};
use crate::reconcile::{AuthorFields, AuthorKey, AuthorWrite, ExistingAuthor};
use crate::sink::traits::{Sink, SinkError, SinkResult};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// An author record held by the graph
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuthorNode {
    #[serde(rename = "authorId", skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "externalIds", skip_serializing_if = "BTreeMap::is_empty")]
    pub external_ids: BTreeMap<String, Vec<String>>,

    /// Title hashes of the papers this author wrote
    pub papers: BTreeSet<String>,
}

impl AuthorNode {
    fn apply(&mut self, fields: &AuthorFields) {
        if self.author_id.is_none() {
            self.author_id = fields.author_id.clone();
        }
        if fields.name.is_some() {
            self.name = fields.name.clone();
        }
        self.external_ids.extend(fields.external_ids.clone());
    }
}

#[derive(Serialize)]
struct GraphExport<'a> {
    nodes: BTreeMap<&'a str, &'a Paper>,
    edges: Vec<[&'a str; 2]>,
    authors: Vec<AuthorExport<'a>>,
}

#[derive(Serialize)]
struct AuthorExport<'a> {
    #[serde(rename = "authorId", skip_serializing_if = "Option::is_none")]
    author_id: Option<&'a str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,

    #[serde(rename = "externalIds", skip_serializing_if = "BTreeMap::is_empty")]
    external_ids: &'a BTreeMap<String, Vec<String>>,

    papers: BTreeSet<&'a str>,
}

/// Citation graph held in memory
///
/// Author node identities are their index in the author arena.
#[derive(Debug, Default)]
pub struct GraphSink {
    nodes: BTreeMap<String, Paper>,
    edges: BTreeSet<(String, String)>,
    authors: Vec<AuthorNode>,
    output: Option<PathBuf>,
}

impl GraphSink {
    /// A graph that is never exported
    pub fn new() -> Self {
        Self::default()
    }

    /// A graph written to `path` on [`Sink::finish`]
    pub fn with_output(path: impl Into<PathBuf>) -> Self {
        Self {
            output: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn papers(&self) -> &BTreeMap<String, Paper> {
        &self.nodes
    }

    /// Edges as (citing, cited) title hashes
    pub fn edges(&self) -> &BTreeSet<(String, String)> {
        &self.edges
    }

    pub fn authors(&self) -> &[AuthorNode] {
        &self.authors
    }

    /// Looks a paper up by its source id
    pub fn paper_by_id(&self, id: &str) -> Option<&Paper> {
        self.nodes.values().find(|p| p.id == id)
    }

    /// Source author ids linked to the paper with title hash `hash`, sorted
    pub fn linked_author_ids(&self, hash: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .authors
            .iter()
            .filter(|a| a.papers.contains(hash))
            .filter_map(|a| a.author_id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Export identity of the paper stored under `hash`
    ///
    /// Nodes merge by title hash but are exported under their source id.
    fn export_id<'a>(&'a self, hash: &'a str) -> &'a str {
        match self.nodes.get(hash) {
            Some(paper) if !paper.id.is_empty() => paper.id.as_str(),
            _ => hash,
        }
    }

    /// The graph as `{"nodes": {id: paper}, "edges": [[citing, cited], ...], "authors": [...]}`
    pub fn to_json(&self) -> SinkResult<serde_json::Value> {
        let export = GraphExport {
            nodes: self
                .nodes
                .iter()
                .map(|(hash, paper)| (self.export_id(hash), paper))
                .collect(),
            edges: self
                .edges
                .iter()
                .map(|(citing, cited)| [self.export_id(citing), self.export_id(cited)])
                .collect(),
            authors: self
                .authors
                .iter()
                .map(|author| AuthorExport {
                    author_id: author.author_id.as_deref(),
                    name: author.name.as_deref(),
                    external_ids: &author.external_ids,
                    papers: author.papers.iter().map(|h| self.export_id(h)).collect(),
                })
                .collect(),
        };
        Ok(serde_json::to_value(export)?)
    }

    /// Writes the JSON export to `path`
    pub fn export(&self, path: &Path) -> SinkResult<()> {
        let json = serde_json::to_string_pretty(&self.to_json()?)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    fn author_index(&self, key: &AuthorKey) -> Option<usize> {
        match key {
            AuthorKey::SourceId(id) => self
                .authors
                .iter()
                .position(|a| a.author_id.as_deref() == Some(id.as_str())),
            AuthorKey::Node(node) => node
                .parse::<usize>()
                .ok()
                .filter(|index| *index < self.authors.len()),
        }
    }

    fn existing(&self, index: usize) -> ExistingAuthor {
        let author = &self.authors[index];
        ExistingAuthor {
            node: index.to_string(),
            author_id: author.author_id.clone(),
            name: author.name.clone(),
        }
    }
}

impl Sink for GraphSink {
    fn write_paper(&mut self, paper: &Paper) -> SinkResult<()> {
        let mut stored = paper.clone();
        stored.authors = None;
        match self.nodes.get_mut(&paper.title_hash()) {
            Some(existing) => existing.merge(stored),
            None => {
                self.nodes.insert(paper.title_hash(), stored);
            }
        }
        Ok(())
    }

    fn write_reference(&mut self, citing: &Paper, cited: &Paper) -> SinkResult<()> {
        let (citing, cited) = (citing.title_hash(), cited.title_hash());
        for hash in [&citing, &cited] {
            if !self.nodes.contains_key(hash) {
                return Err(SinkError::NotFound(format!("paper {}", hash)));
            }
        }
        if citing != cited {
            self.edges.insert((citing, cited));
        }
        Ok(())
    }

    fn correlated_authors(&self, paper: &Paper) -> SinkResult<Vec<ExistingAuthor>> {
        let hash = paper.title_hash();
        let fresh = paper.authors.as_deref().unwrap_or(&[]);
        let ids: BTreeSet<&str> = fresh.iter().filter_map(|a| a.id.as_deref()).collect();
        let names: BTreeSet<String> = fresh.iter().filter_map(|a| a.normalized_name()).collect();

        let found = self
            .authors
            .iter()
            .enumerate()
            .filter(|(_, author)| {
                author.papers.contains(&hash)
                    || author
                        .author_id
                        .as_deref()
                        .map_or(false, |id| ids.contains(id))
                    || (author.author_id.is_none()
                        && author
                            .name
                            .as_deref()
                            .map_or(false, |n| names.contains(&normalize_name(n))))
            })
            .map(|(index, _)| self.existing(index))
            .collect();
        Ok(found)
    }

    fn write_author(&mut self, paper: &Paper, write: &AuthorWrite) -> SinkResult<()> {
        let hash = paper.title_hash();

        if let Some(unlink) = &write.unlink {
            if let Some(index) = self.author_index(unlink) {
                self.authors[index].papers.remove(&hash);
            }
        }

        let index = match &write.key {
            AuthorKey::SourceId(id) => match self.author_index(&write.key) {
                Some(index) => index,
                None => {
                    self.authors.push(AuthorNode {
                        author_id: Some(id.clone()),
                        ..AuthorNode::default()
                    });
                    self.authors.len() - 1
                }
            },
            AuthorKey::Node(node) => {
                let index = self
                    .author_index(&write.key)
                    .ok_or_else(|| SinkError::NotFound(format!("author node {}", node)))?;
                let owner = write
                    .fields
                    .author_id
                    .as_ref()
                    .and_then(|id| self.author_index(&AuthorKey::SourceId(id.clone())));
                match owner {
                    Some(owner) if owner != index => {
                        self.authors[index].papers.remove(&hash);
                        owner
                    }
                    _ => index,
                }
            }
        };

        let author = &mut self.authors[index];
        author.apply(&write.fields);
        author.papers.insert(hash);
        Ok(())
    }

    fn finish(&mut self) -> SinkResult<()> {
        if let Some(path) = &self.output {
            self.export(path)?;
            tracing::info!(
                "Exported {} papers and {} edges to {}",
                self.nodes.len(),
                self.edges.len(),
                path.display()
            );
        }
        Ok(())
    }
}
