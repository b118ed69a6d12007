//! Paper registry and reference index
//!
//! Papers live in a flat map keyed by id. Citation edges are id pairs in a
//! separate pending index until both endpoints have been written, at which
//! point they are handed out once and remembered as persisted. Every
//! mutation is an insert-if-absent or a forward-only merge, so the order in
//! which concurrent expansions land does not matter.

use crate::model::Paper;
use crate::state::PaperState;
use std::collections::{HashMap, HashSet};

/// A paper together with its crawl bookkeeping
#[derive(Debug, Clone)]
pub struct PaperEntry {
    pub paper: Paper,
    pub state: PaperState,

    /// Whether the sink has accepted this paper
    pub written: bool,
}

/// Arena of papers plus the pending citation index
#[derive(Debug, Default)]
pub struct Registry {
    papers: HashMap<String, PaperEntry>,

    /// citing id -> cited ids not yet persisted
    pending: HashMap<String, HashSet<String>>,

    /// cited id -> citing ids not yet persisted
    pending_reverse: HashMap<String, HashSet<String>>,

    /// Pairs already handed to the sink
    persisted: HashSet<(String, String)>,

    /// Requested id -> id the source resolved it to
    aliases: HashMap<String, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Follows an alias to the id the source actually uses
    pub fn canonical<'a>(&'a self, id: &'a str) -> &'a str {
        self.aliases.get(id).map(String::as_str).unwrap_or(id)
    }

    pub fn get(&self, id: &str) -> Option<&PaperEntry> {
        self.papers.get(self.canonical(id))
    }

    pub fn state(&self, id: &str) -> Option<PaperState> {
        self.get(id).map(|e| e.state)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    /// Inserts an unconfirmed paper if the id is new
    ///
    /// Returns true if the id was not known before.
    pub fn insert_stub(&mut self, mut paper: Paper) -> bool {
        let id = self.canonical(&paper.id).to_string();
        if self.papers.contains_key(&id) {
            return false;
        }
        paper.id = id.clone();
        self.papers.insert(
            id,
            PaperEntry {
                paper,
                state: PaperState::Unknown,
                written: false,
            },
        );
        true
    }

    /// Records a fully fetched paper, merging into any existing entry
    pub fn record_paper(&mut self, paper: Paper) {
        let id = paper.id.clone();
        match self.papers.get_mut(&id) {
            Some(entry) => {
                entry.paper.merge(paper);
                if entry.state.can_advance_to(PaperState::Fetched) {
                    entry.state = PaperState::Fetched;
                }
            }
            None => {
                self.papers.insert(
                    id,
                    PaperEntry {
                        paper,
                        state: PaperState::Fetched,
                        written: false,
                    },
                );
            }
        }
    }

    /// Retires `requested` in favour of the id the source resolved it to
    pub fn alias(&mut self, requested: &str, resolved: &str) {
        if requested == resolved {
            return;
        }
        if let Some(entry) = self.papers.get(requested) {
            if entry.state != PaperState::Unknown {
                return;
            }
        }
        self.papers.remove(requested);
        self.aliases
            .insert(requested.to_string(), resolved.to_string());

        // Re-key edges recorded under the retired id
        if let Some(cited) = self.pending.remove(requested) {
            for target in cited {
                self.forget_reverse(&target, requested);
                self.record_reference(resolved, &target);
            }
        }
        if let Some(citing) = self.pending_reverse.remove(requested) {
            for source in citing {
                if let Some(set) = self.pending.get_mut(&source) {
                    set.remove(requested);
                    if set.is_empty() {
                        self.pending.remove(&source);
                    }
                }
                self.record_reference(&source, resolved);
            }
        }
    }

    fn forget_reverse(&mut self, cited: &str, citing: &str) {
        if let Some(set) = self.pending_reverse.get_mut(cited) {
            set.remove(citing);
            if set.is_empty() {
                self.pending_reverse.remove(cited);
            }
        }
    }

    /// Moves a paper forward; backwards moves are ignored
    ///
    /// Returns true if the state changed.
    pub fn advance(&mut self, id: &str, next: PaperState) -> bool {
        let id = self.canonical(id).to_string();
        match self.papers.get_mut(&id) {
            Some(entry) if entry.state.can_advance_to(next) => {
                entry.state = next;
                true
            }
            Some(entry) => {
                tracing::trace!("Ignoring {} -> {} for {}", entry.state, next, id);
                false
            }
            None => false,
        }
    }

    pub fn mark_written(&mut self, id: &str) {
        let id = self.canonical(id).to_string();
        if let Some(entry) = self.papers.get_mut(&id) {
            entry.written = true;
        }
    }

    pub fn is_written(&self, id: &str) -> bool {
        self.get(id).map_or(false, |e| e.written)
    }

    /// Records a citing -> cited pair
    ///
    /// Returns true if the pair is new: neither pending nor already
    /// persisted. Self-citations are ignored.
    pub fn record_reference(&mut self, citing: &str, cited: &str) -> bool {
        let citing = self.canonical(citing).to_string();
        let cited = self.canonical(cited).to_string();
        if citing == cited || self.persisted.contains(&(citing.clone(), cited.clone())) {
            return false;
        }

        let inserted = self
            .pending
            .entry(citing.clone())
            .or_default()
            .insert(cited.clone());
        if inserted {
            self.pending_reverse.entry(cited).or_default().insert(citing);
        }
        inserted
    }

    /// Ids still to be expanded, in a stable order
    pub fn frontier(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .papers
            .iter()
            .filter(|(_, e)| e.state.is_frontier())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Removes and returns every pending edge touching `id` whose two
    /// endpoints are both written
    pub fn take_writable_edges(&mut self, id: &str) -> Vec<(String, String)> {
        let id = self.canonical(id).to_string();
        if !self.is_written(&id) {
            return Vec::new();
        }

        let mut ready = Vec::new();
        if let Some(cited) = self.pending.get(&id) {
            ready.extend(
                cited
                    .iter()
                    .filter(|c| self.is_written(c))
                    .map(|c| (id.clone(), c.clone())),
            );
        }
        if let Some(citing) = self.pending_reverse.get(&id) {
            ready.extend(
                citing
                    .iter()
                    .filter(|c| self.is_written(c))
                    .map(|c| (c.clone(), id.clone())),
            );
        }
        ready.sort();
        ready.dedup();

        for (citing, cited) in &ready {
            self.remove_pending(citing, cited);
            self.persisted.insert((citing.clone(), cited.clone()));
        }
        ready
    }

    fn remove_pending(&mut self, citing: &str, cited: &str) {
        if let Some(set) = self.pending.get_mut(citing) {
            set.remove(cited);
            if set.is_empty() {
                self.pending.remove(citing);
            }
        }
        self.forget_reverse(cited, citing);
    }

    /// Number of recorded edges not yet persisted
    pub fn pending_edges(&self) -> usize {
        self.pending.values().map(HashSet::len).sum()
    }

    pub fn persisted_edges(&self) -> usize {
        self.persisted.len()
    }

    pub fn count_by_state(&self, state: PaperState) -> usize {
        self.papers.values().filter(|e| e.state == state).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(registry: &mut Registry, id: &str) {
        registry.record_paper(Paper::new(id, format!("Title {}", id)));
        registry.mark_written(id);
    }

    #[test]
    fn test_stub_insert_if_absent() {
        let mut registry = Registry::new();
        assert!(registry.insert_stub(Paper::new("p1", "One")));
        assert!(!registry.insert_stub(Paper::new("p1", "Changed")));
        assert_eq!(registry.get("p1").unwrap().paper.title, "One");
        assert_eq!(registry.state("p1"), Some(PaperState::Unknown));
    }

    #[test]
    fn test_record_paper_upgrades_stub() {
        let mut registry = Registry::new();
        registry.insert_stub(Paper::new("p1", "One"));
        let mut full = Paper::new("p1", "One");
        full.year = Some(2020);
        registry.record_paper(full);

        let entry = registry.get("p1").unwrap();
        assert_eq!(entry.state, PaperState::Fetched);
        assert_eq!(entry.paper.year, Some(2020));
    }

    #[test]
    fn test_advance_never_regresses() {
        let mut registry = Registry::new();
        registry.record_paper(Paper::new("p1", "One"));
        assert!(registry.advance("p1", PaperState::Expanded));
        assert!(!registry.advance("p1", PaperState::Fetched));

        registry.record_paper(Paper::new("p1", "One again"));
        assert_eq!(registry.state("p1"), Some(PaperState::Expanded));
    }

    #[test]
    fn test_frontier_excludes_terminal() {
        let mut registry = Registry::new();
        registry.insert_stub(Paper::new("b", "B"));
        registry.insert_stub(Paper::new("a", "A"));
        registry.record_paper(Paper::new("c", "C"));
        registry.advance("c", PaperState::Expanded);

        assert_eq!(registry.frontier(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_reference_counted_once() {
        let mut registry = Registry::new();
        assert!(registry.record_reference("a", "b"));
        assert!(!registry.record_reference("a", "b"));
        assert!(!registry.record_reference("a", "a"));
        assert_eq!(registry.pending_edges(), 1);
    }

    #[test]
    fn test_edges_wait_for_both_endpoints() {
        let mut registry = Registry::new();
        registry.record_reference("a", "b");
        written(&mut registry, "a");
        assert!(registry.take_writable_edges("a").is_empty());

        written(&mut registry, "b");
        let edges = registry.take_writable_edges("b");
        assert_eq!(edges, vec![("a".to_string(), "b".to_string())]);
        assert_eq!(registry.pending_edges(), 0);
    }

    #[test]
    fn test_persisted_edges_never_regrow() {
        let mut registry = Registry::new();
        written(&mut registry, "a");
        written(&mut registry, "b");
        registry.record_reference("a", "b");
        assert_eq!(registry.take_writable_edges("a").len(), 1);

        assert!(!registry.record_reference("a", "b"));
        assert!(registry.take_writable_edges("a").is_empty());
        assert_eq!(registry.persisted_edges(), 1);
    }

    #[test]
    fn test_alias_retires_requested_id() {
        let mut registry = Registry::new();
        registry.insert_stub(Paper::new("DOI:10.1/x", ""));
        registry.alias("DOI:10.1/x", "p1");
        registry.record_paper(Paper::new("p1", "Resolved"));

        assert_eq!(registry.get("DOI:10.1/x").unwrap().paper.id, "p1");
        assert_eq!(registry.frontier(), vec!["p1".to_string()]);
        assert!(!registry.insert_stub(Paper::new("DOI:10.1/x", "")));
    }

    #[test]
    fn test_alias_rekeys_pending_edges() {
        let mut registry = Registry::new();
        registry.insert_stub(Paper::new("DOI:10.1/x", ""));
        registry.record_reference("DOI:10.1/x", "b");
        registry.record_reference("c", "DOI:10.1/x");
        registry.alias("DOI:10.1/x", "p1");
        assert_eq!(registry.pending_edges(), 2);

        written(&mut registry, "p1");
        written(&mut registry, "b");
        written(&mut registry, "c");
        let edges = registry.take_writable_edges("p1");
        assert_eq!(
            edges,
            vec![
                ("c".to_string(), "p1".to_string()),
                ("p1".to_string(), "b".to_string()),
            ]
        );
    }
}
