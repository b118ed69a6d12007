//! Expansion state of a paper id within one engine instance

use std::fmt;

/// Where a paper id stands in the breadth-first walk
///
/// States only move forward: `Unknown -> Fetched -> Expanded`, with
/// `Filtered` as the alternative terminal for papers the filter rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaperState {
    /// Id is known (seed or edge target) but no full record was fetched
    Unknown,

    /// Full record fetched, references and citations not yet walked
    Fetched,

    /// References and citations walked
    Expanded,

    /// Rejected by the paper filter; never expanded or written
    Filtered,
}

impl PaperState {
    /// Returns true if the id still belongs to the frontier
    pub fn is_frontier(&self) -> bool {
        matches!(self, Self::Unknown | Self::Fetched)
    }

    /// Returns true if a full record has been fetched
    pub fn is_materialized(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Expanded | Self::Filtered)
    }

    /// Returns true if moving to `next` goes forward
    pub fn can_advance_to(&self, next: PaperState) -> bool {
        matches!(
            (self, next),
            (Self::Unknown, Self::Fetched)
                | (Self::Unknown, Self::Expanded)
                | (Self::Unknown, Self::Filtered)
                | (Self::Fetched, Self::Expanded)
                | (Self::Fetched, Self::Filtered)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Fetched => "fetched",
            Self::Expanded => "expanded",
            Self::Filtered => "filtered",
        }
    }
}

impl fmt::Display for PaperState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
