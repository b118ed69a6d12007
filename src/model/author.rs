use serde::Serialize;
use std::collections::BTreeMap;

/// Normalizes a display name for comparison
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// An author as returned by the source
///
/// Authors without a source id are identified only by name for the
/// duration of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Author {
    #[serde(rename = "authorId")]
    pub id: Option<String>,

    pub name: Option<String>,

    /// Identifiers in other systems, e.g. `DBLP -> ["Jane Doe 0001"]`
    #[serde(rename = "externalIds", skip_serializing_if = "BTreeMap::is_empty")]
    pub external_ids: BTreeMap<String, Vec<String>>,
}

impl Author {
    pub fn new(id: Option<&str>, name: Option<&str>) -> Self {
        Self {
            id: id.map(str::to_string),
            name: name.map(str::to_string),
            external_ids: BTreeMap::new(),
        }
    }

    pub fn normalized_name(&self) -> Option<String> {
        self.name
            .as_deref()
            .map(normalize_name)
            .filter(|n| !n.is_empty())
    }
}
