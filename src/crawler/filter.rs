//! Predicates deciding which fetched papers the crawl keeps

use crate::model::Paper;

/// Opaque predicate over a fully fetched paper
///
/// Rejected papers are neither expanded nor written.
pub trait PaperFilter: Send + Sync {
    fn accept(&self, paper: &Paper) -> bool;
}

/// Accepts every paper
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl PaperFilter for AcceptAll {
    fn accept(&self, _paper: &Paper) -> bool {
        true
    }
}

/// Rejects papers published before a given year
///
/// Papers without a year are kept.
#[derive(Debug, Clone, Copy)]
pub struct YearFilter {
    pub min_year: i32,
}

impl YearFilter {
    pub fn new(min_year: i32) -> Self {
        Self { min_year }
    }
}

impl PaperFilter for YearFilter {
    fn accept(&self, paper: &Paper) -> bool {
        paper.year.map_or(true, |year| year >= self.min_year)
    }
}
