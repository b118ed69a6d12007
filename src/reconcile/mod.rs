//! Author reconciliation
//!
//! Matches the freshly fetched authors of a paper against the author records
//! a sink already holds for it, and turns the result into write instructions:
//!
//! | Candidate                                   | Instruction                          |
//! |---------------------------------------------|--------------------------------------|
//! | source id among the fresh ids               | confirm link, no field changes       |
//! | stale source id, name matches a fresh author| unlink stale id, link the fresh id   |
//! | no source id, name matches a fresh author   | add the fresh id to the candidate    |
//! | no match                                    | nothing, candidate left untouched    |
//!
//! Id agreement always wins over name agreement. Fresh authors with a source
//! id that no candidate accounted for are linked as new authors.

use crate::model::{normalize_name, Author, Paper};
use std::collections::{BTreeMap, HashMap, HashSet};

/// An author record already present in a sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingAuthor {
    /// The sink's own identity for this record
    pub node: String,

    /// Source author id the sink has recorded, if any
    pub author_id: Option<String>,

    pub name: Option<String>,
}

/// How a write instruction addresses an author record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AuthorKey {
    /// The record carrying this source author id (created if absent)
    SourceId(String),

    /// A specific sink record, by the sink's own identity
    Node(String),
}

/// Fields to set on the addressed author record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorFields {
    pub author_id: Option<String>,
    pub name: Option<String>,
    pub external_ids: BTreeMap<String, Vec<String>>,
}

impl AuthorFields {
    /// Everything the source knows about `author`
    pub fn from_author(author: &Author) -> Self {
        Self {
            author_id: author.id.clone(),
            name: author.name.clone(),
            external_ids: author.external_ids.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.author_id.is_none() && self.name.is_none() && self.external_ids.is_empty()
    }
}

/// One reconciliation instruction for a sink
///
/// When `unlink` is present the sink removes that author's link to the paper
/// before applying the write and linking `key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorWrite {
    pub key: AuthorKey,
    pub fields: AuthorFields,
    pub unlink: Option<AuthorKey>,
}

impl AuthorWrite {
    fn confirm(author_id: &str) -> Self {
        Self {
            key: AuthorKey::SourceId(author_id.to_string()),
            fields: AuthorFields::default(),
            unlink: None,
        }
    }
}

/// Matches fresh author lists against existing sink records
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorReconciler;

impl AuthorReconciler {
    pub fn new() -> Self {
        Self
    }

    /// Produces the write instructions for one paper
    ///
    /// # Arguments
    ///
    /// * `paper` - The paper, with its freshly fetched authors resolved
    /// * `existing` - Candidates the sink correlates with this paper,
    ///   already deduplicated by the sink
    pub fn reconcile(&self, paper: &Paper, existing: &[ExistingAuthor]) -> Vec<AuthorWrite> {
        let fresh = paper.authors.as_deref().unwrap_or(&[]);

        let by_id: HashMap<&str, &Author> = fresh
            .iter()
            .filter_map(|a| a.id.as_deref().map(|id| (id, a)))
            .collect();
        let mut by_name: HashMap<String, &Author> = HashMap::new();
        for author in fresh {
            if let Some(name) = author.normalized_name() {
                by_name.entry(name).or_insert(author);
            }
        }

        let mut writes = Vec::new();
        let mut covered: HashSet<&str> = HashSet::new();

        for candidate in existing {
            let name_match = candidate
                .name
                .as_deref()
                .map(normalize_name)
                .and_then(|name| by_name.get(&name).copied());

            match candidate.author_id.as_deref() {
                Some(id) if by_id.contains_key(id) => {
                    writes.push(AuthorWrite::confirm(id));
                    covered.insert(id);
                }
                Some(stale) => {
                    let Some((author, fresh_id)) =
                        name_match.and_then(|a| a.id.as_deref().map(|id| (a, id)))
                    else {
                        continue;
                    };
                    tracing::debug!(
                        "Dividing author link on {}: {} -> {}",
                        paper.id,
                        stale,
                        fresh_id
                    );
                    writes.push(AuthorWrite {
                        key: AuthorKey::SourceId(fresh_id.to_string()),
                        fields: AuthorFields::from_author(author),
                        unlink: Some(AuthorKey::SourceId(stale.to_string())),
                    });
                    covered.insert(fresh_id);
                }
                None => {
                    let Some((author, fresh_id)) =
                        name_match.and_then(|a| a.id.as_deref().map(|id| (a, id)))
                    else {
                        continue;
                    };
                    writes.push(AuthorWrite {
                        key: AuthorKey::Node(candidate.node.clone()),
                        fields: AuthorFields::from_author(author),
                        unlink: None,
                    });
                    covered.insert(fresh_id);
                }
            }
        }

        for author in fresh {
            if let Some(id) = author.id.as_deref() {
                if covered.insert(id) {
                    writes.push(AuthorWrite {
                        key: AuthorKey::SourceId(id.to_string()),
                        fields: AuthorFields::from_author(author),
                        unlink: None,
                    });
                }
            }
        }

        writes
    }
}
