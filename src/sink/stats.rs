//! Sink statistics and their console rendering

/// Summary of what a sink holds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkStatistics {
    pub papers: u64,
    pub citations: u64,
    pub authors: u64,

    /// Authors known only by name
    pub unidentified_authors: u64,

    /// Author to paper links
    pub author_links: u64,

    pub earliest_year: Option<i32>,
    pub latest_year: Option<i32>,
}

impl SinkStatistics {
    /// Average number of stored citations per paper
    pub fn citations_per_paper(&self) -> f64 {
        if self.papers == 0 {
            0.0
        } else {
            self.citations as f64 / self.papers as f64
        }
    }
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &SinkStatistics) {
    println!("=== Citation Graph Statistics ===\n");

    println!("Papers:");
    println!("  Total papers: {}", stats.papers);
    if let (Some(earliest), Some(latest)) = (stats.earliest_year, stats.latest_year) {
        println!("  Years covered: {} - {}", earliest, latest);
    }
    println!();

    println!("Citations:");
    println!("  Total edges: {}", stats.citations);
    println!("  Per paper: {:.2}", stats.citations_per_paper());
    println!();

    println!("Authors:");
    println!("  Total authors: {}", stats.authors);
    println!("  Without source id: {}", stats.unidentified_authors);
    println!("  Authorship links: {}", stats.author_links);
}
