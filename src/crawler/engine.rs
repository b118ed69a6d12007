//! Breadth-first crawl engine
//!
//! Each step spawns one expansion task per frontier id into a `JoinSet`.
//! Tasks only talk to the source; the engine alone touches the registry and
//! the sink, merging each task's result the moment it completes. A fast
//! expansion is therefore written downstream while slower ones are still in
//! flight.

use crate::config::CrawlConfig;
use crate::crawler::filter::{AcceptAll, PaperFilter};
use crate::model::Paper;
use crate::reconcile::AuthorReconciler;
use crate::sink::Sink;
use crate::source::PaperSource;
use crate::state::{PaperState, Registry};
use std::sync::Arc;
use tokio::task::JoinSet;

/// Where a crawl starts
#[derive(Debug, Clone, Default)]
pub struct Seeds {
    pub paper_ids: Vec<String>,

    /// Authors whose papers join the seeds
    pub author_ids: Vec<String>,

    /// Titles resolved through exact title search
    pub titles: Vec<String>,
}

impl Seeds {
    /// Seeds consisting of paper ids only
    pub fn papers<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paper_ids: ids.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn from_config(config: &CrawlConfig) -> Self {
        Self {
            paper_ids: config.paper_ids.clone(),
            author_ids: config.author_ids.clone(),
            titles: config.titles.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.paper_ids.is_empty() && self.author_ids.is_empty() && self.titles.is_empty()
    }
}

/// Counters for one expansion, one step, or a whole crawl
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Expansions issued
    pub attempted: usize,

    /// Papers fetched for the first time
    pub fetched: usize,

    pub expanded: usize,
    pub filtered: usize,

    /// Expansions that obtained nothing usable
    pub unavailable: usize,

    /// Citation pairs neither pending nor persisted before
    pub new_edges: usize,

    pub papers_written: usize,
    pub edges_written: usize,
    pub author_writes: usize,
    pub sink_errors: usize,
}

impl StepReport {
    /// Adds another report's counters to this one
    pub fn add(&mut self, other: &StepReport) {
        self.attempted += other.attempted;
        self.fetched += other.fetched;
        self.expanded += other.expanded;
        self.filtered += other.filtered;
        self.unavailable += other.unavailable;
        self.new_edges += other.new_edges;
        self.papers_written += other.papers_written;
        self.edges_written += other.edges_written;
        self.author_writes += other.author_writes;
        self.sink_errors += other.sink_errors;
    }
}

/// Outcome of `run_to_fixpoint`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub steps: u32,
    pub totals: StepReport,

    /// False when the step budget ran out first
    pub reached_fixpoint: bool,
}

/// What one expansion task brought back
enum Expansion {
    Unavailable {
        requested: String,
    },
    Filtered {
        requested: String,
        paper: Paper,
    },
    Walked {
        requested: String,
        paper: Paper,

        /// The paper record was fetched by this task
        fresh: bool,
        references: Option<Vec<Paper>>,
        citations: Option<Vec<Paper>>,
    },
}

/// Fetch half of `expand`, run as a spawned task
async fn walk(
    source: Arc<dyn PaperSource>,
    filter: Arc<dyn PaperFilter>,
    requested: String,
    known: Option<Paper>,
) -> Expansion {
    let (mut paper, fresh) = match known {
        Some(paper) => (paper, false),
        None => {
            let Some(paper) = source.get_paper(&requested).await else {
                return Expansion::Unavailable { requested };
            };
            if !filter.accept(&paper) {
                return Expansion::Filtered { requested, paper };
            }
            (paper, true)
        }
    };

    let authors = async {
        if fresh {
            source.get_authors(&paper.id).await
        } else {
            None
        }
    };
    let (references, citations, authors) = tokio::join!(
        source.get_references(&paper.id),
        source.get_citations(&paper.id),
        authors
    );

    // Full author records win over the list embedded in the paper
    if let Some(authors) = authors {
        paper.authors = Some(authors);
    }

    Expansion::Walked {
        requested,
        paper,
        fresh,
        references,
        citations,
    }
}

/// Seed lookups that need the source
enum SeedLookup {
    Title(String, Option<String>),
    Author(String, Option<Vec<Paper>>),
}

/// Incremental breadth-first crawler over a paper source
pub struct CrawlEngine<K: Sink> {
    source: Arc<dyn PaperSource>,
    filter: Arc<dyn PaperFilter>,
    registry: Registry,
    reconciler: AuthorReconciler,
    sink: K,
    seeds: Seeds,
    seeded: bool,
}

impl<K: Sink> CrawlEngine<K> {
    pub fn new(source: Arc<dyn PaperSource>, sink: K) -> Self {
        Self {
            source,
            filter: Arc::new(AcceptAll),
            registry: Registry::new(),
            reconciler: AuthorReconciler::new(),
            sink,
            seeds: Seeds::default(),
            seeded: false,
        }
    }

    pub fn with_filter(mut self, filter: Arc<dyn PaperFilter>) -> Self {
        self.filter = filter;
        self
    }

    /// Seeds resolved on the first step
    pub fn with_seeds(mut self, seeds: Seeds) -> Self {
        self.seeds = seeds;
        self.seeded = false;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    pub fn into_sink(self) -> K {
        self.sink
    }

    /// Expands a single paper id
    ///
    /// An id that is already expanded or filtered costs no fetches and
    /// yields no edges.
    pub async fn expand(&mut self, id: &str) -> StepReport {
        let mut report = StepReport::default();
        let Some(known) = self.walk_input(id) else {
            return report;
        };

        report.attempted = 1;
        let expansion = walk(
            self.source.clone(),
            self.filter.clone(),
            self.registry.canonical(id).to_string(),
            known,
        )
        .await;
        self.absorb(expansion, &mut report);
        report
    }

    /// Runs one breadth-first layer over the current frontier
    pub async fn run_step(&mut self) -> StepReport {
        if !self.seeded {
            self.resolve_seeds().await;
            self.seeded = true;
        }

        let mut report = StepReport::default();
        let mut tasks = JoinSet::new();
        for id in self.registry.frontier() {
            let Some(known) = self.walk_input(&id) else {
                continue;
            };
            tasks.spawn(walk(self.source.clone(), self.filter.clone(), id, known));
            report.attempted += 1;
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(expansion) => self.absorb(expansion, &mut report),
                Err(e) => tracing::warn!("Expansion task failed: {}", e),
            }
        }

        report
    }

    /// Repeats steps until one discovers no new edges or the budget runs out
    pub async fn run_to_fixpoint(&mut self, max_steps: Option<u32>) -> CrawlSummary {
        let mut summary = CrawlSummary::default();

        loop {
            if let Some(max) = max_steps {
                if summary.steps >= max {
                    tracing::info!("Step budget of {} exhausted", max);
                    break;
                }
            }

            let report = self.run_step().await;
            summary.steps += 1;
            summary.totals.add(&report);
            tracing::info!(
                "Step {}: {} expansions, {} fetched, {} new edges, {} papers and {} edges written",
                summary.steps,
                report.attempted,
                report.fetched,
                report.new_edges,
                report.papers_written,
                report.edges_written
            );

            if report.new_edges == 0 {
                summary.reached_fixpoint = true;
                break;
            }
        }

        tracing::info!(
            "Crawl finished after {} steps: {} papers known, {} edges persisted, {} pending",
            summary.steps,
            self.registry.len(),
            self.registry.persisted_edges(),
            self.registry.pending_edges()
        );
        summary
    }

    /// `None` when `id` needs no walk, otherwise the materialized record if any
    fn walk_input(&self, id: &str) -> Option<Option<Paper>> {
        match self.registry.get(id) {
            Some(entry) if entry.state.is_terminal() => None,
            Some(entry) if entry.state.is_materialized() => Some(Some(entry.paper.clone())),
            _ => Some(None),
        }
    }

    async fn resolve_seeds(&mut self) {
        let seeds = std::mem::take(&mut self.seeds);
        for id in &seeds.paper_ids {
            self.registry.insert_stub(Paper::new(id.as_str(), ""));
        }

        let mut lookups = JoinSet::new();
        for title in seeds.titles {
            let source = self.source.clone();
            lookups.spawn(async move {
                let found = source.search_by_title(&title).await;
                SeedLookup::Title(title, found)
            });
        }
        for author in seeds.author_ids {
            let source = self.source.clone();
            lookups.spawn(async move {
                let papers = source.get_papers_by_author(&author).await;
                SeedLookup::Author(author, papers)
            });
        }

        while let Some(joined) = lookups.join_next().await {
            match joined {
                Ok(SeedLookup::Title(title, Some(id))) => {
                    tracing::info!("Resolved title '{}' to {}", title, id);
                    self.registry.insert_stub(Paper::new(id, title));
                }
                Ok(SeedLookup::Title(title, None)) => {
                    tracing::warn!("No paper found for title '{}'", title);
                }
                Ok(SeedLookup::Author(author, Some(papers))) => {
                    tracing::info!("Author {} contributes {} seed papers", author, papers.len());
                    for paper in papers {
                        self.registry.insert_stub(paper);
                    }
                }
                Ok(SeedLookup::Author(author, None)) => {
                    tracing::warn!("No papers found for author {}", author);
                }
                Err(e) => tracing::warn!("Seed lookup failed: {}", e),
            }
        }
    }

    /// Merges one expansion into the registry and forwards it downstream
    fn absorb(&mut self, expansion: Expansion, report: &mut StepReport) {
        match expansion {
            Expansion::Unavailable { requested } => {
                tracing::warn!("No data for paper {}", requested);
                report.unavailable += 1;
            }
            Expansion::Filtered { requested, paper } => {
                let id = paper.id.clone();
                tracing::debug!("Filtered out {} ({:?})", id, paper.year);
                self.registry.alias(&requested, &id);
                self.registry.record_paper(paper);
                self.registry.advance(&id, PaperState::Filtered);
                report.filtered += 1;
            }
            Expansion::Walked {
                requested,
                paper,
                fresh,
                references,
                citations,
            } => {
                let id = paper.id.clone();
                if fresh {
                    self.registry.alias(&requested, &id);
                    self.registry.record_paper(paper);
                    report.fetched += 1;
                }

                let complete = references.is_some() && citations.is_some();
                for cited in references.into_iter().flatten() {
                    let cited_id = cited.id.clone();
                    self.registry.insert_stub(cited);
                    if self.registry.record_reference(&id, &cited_id) {
                        report.new_edges += 1;
                    }
                }
                for citing in citations.into_iter().flatten() {
                    let citing_id = citing.id.clone();
                    self.registry.insert_stub(citing);
                    if self.registry.record_reference(&citing_id, &id) {
                        report.new_edges += 1;
                    }
                }

                if complete {
                    self.registry.advance(&id, PaperState::Expanded);
                    report.expanded += 1;
                } else {
                    tracing::warn!("Edges of {} only partly available, will walk again", id);
                }

                if fresh {
                    self.forward(&id, report);
                } else {
                    self.flush_edges(&id, report);
                }
            }
        }
    }

    /// Writes a newly fetched paper, its author links and any edges it completes
    fn forward(&mut self, id: &str, report: &mut StepReport) {
        let Some(paper) = self.registry.get(id).map(|e| e.paper.clone()) else {
            return;
        };

        if let Err(e) = self.sink.write_paper(&paper) {
            tracing::warn!("Failed to write paper {}: {}", id, e);
            report.sink_errors += 1;
            return;
        }
        self.registry.mark_written(id);
        report.papers_written += 1;

        self.write_authors(&paper, report);
        self.flush_edges(id, report);
    }

    fn write_authors(&mut self, paper: &Paper, report: &mut StepReport) {
        if paper.authors.is_none() {
            return;
        }

        let existing = match self.sink.correlated_authors(paper) {
            Ok(existing) => existing,
            Err(e) => {
                tracing::warn!("Failed to load authors for {}: {}", paper.id, e);
                report.sink_errors += 1;
                return;
            }
        };

        for write in self.reconciler.reconcile(paper, &existing) {
            match self.sink.write_author(paper, &write) {
                Ok(()) => report.author_writes += 1,
                Err(e) => {
                    tracing::warn!("Failed to write author {:?} on {}: {}", write.key, paper.id, e);
                    report.sink_errors += 1;
                }
            }
        }
    }

    fn flush_edges(&mut self, id: &str, report: &mut StepReport) {
        for (citing, cited) in self.registry.take_writable_edges(id) {
            let (Some(citing), Some(cited)) = (self.registry.get(&citing), self.registry.get(&cited))
            else {
                continue;
            };
            match self.sink.write_reference(&citing.paper, &cited.paper) {
                Ok(()) => report.edges_written += 1,
                Err(e) => {
                    tracing::warn!(
                        "Failed to write edge {} -> {}: {}",
                        citing.paper.id,
                        cited.paper.id,
                        e
                    );
                    report.sink_errors += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::filter::YearFilter;
    use crate::model::{normalize_title, Author};
    use crate::reconcile::{AuthorWrite, ExistingAuthor};
    use crate::sink::{GraphSink, SinkError, SinkResult};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct FakeSource {
        papers: HashMap<String, Paper>,
        cites: Vec<(String, String)>,
        aliases: HashMap<String, String>,
        by_author: HashMap<String, Vec<String>>,
        delays: HashMap<String, u64>,
        fetches: AtomicUsize,
        finished: Mutex<HashMap<String, Instant>>,
    }

    impl FakeSource {
        fn paper(mut self, id: &str, title: &str, year: Option<i32>) -> Self {
            let mut paper = Paper::new(id, title);
            paper.year = year;
            self.papers.insert(id.to_string(), paper);
            self
        }

        fn cites(mut self, citing: &str, cited: &str) -> Self {
            self.cites.push((citing.to_string(), cited.to_string()));
            self
        }

        fn authors(mut self, id: &str, authors: Vec<Author>) -> Self {
            if let Some(paper) = self.papers.get_mut(id) {
                paper.authors = Some(authors);
            }
            self
        }

        fn delay(mut self, id: &str, ms: u64) -> Self {
            self.delays.insert(id.to_string(), ms);
            self
        }

        fn lookup(&self, id: &str) -> Option<&Paper> {
            let id = self.aliases.get(id).map(String::as_str).unwrap_or(id);
            self.papers.get(id)
        }

        fn brief(&self, id: &str) -> Option<Paper> {
            self.papers.get(id).map(|p| Paper {
                authors: None,
                ..p.clone()
            })
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PaperSource for FakeSource {
        async fn search_by_title(&self, title: &str) -> Option<String> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.papers
                .values()
                .find(|p| normalize_title(&p.title) == normalize_title(title))
                .map(|p| p.id.clone())
        }

        async fn get_paper(&self, id: &str) -> Option<Paper> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if let Some(ms) = self.delays.get(id) {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
            let paper = self.lookup(id).cloned();
            self.finished
                .lock()
                .unwrap()
                .insert(id.to_string(), Instant::now());
            paper
        }

        async fn get_authors(&self, id: &str) -> Option<Vec<Author>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.lookup(id).and_then(|p| p.authors.clone())
        }

        async fn get_references(&self, id: &str) -> Option<Vec<Paper>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.lookup(id)?;
            Some(
                self.cites
                    .iter()
                    .filter(|(citing, _)| citing == id)
                    .filter_map(|(_, cited)| self.brief(cited))
                    .collect(),
            )
        }

        async fn get_citations(&self, id: &str) -> Option<Vec<Paper>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.lookup(id)?;
            Some(
                self.cites
                    .iter()
                    .filter(|(_, cited)| cited == id)
                    .filter_map(|(citing, _)| self.brief(citing))
                    .collect(),
            )
        }

        async fn get_papers_by_author(&self, author_id: &str) -> Option<Vec<Paper>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let ids = self.by_author.get(author_id)?;
            Some(ids.iter().filter_map(|id| self.brief(id)).collect())
        }
    }

    /// Graph sink that also records when each paper arrived
    #[derive(Default)]
    struct RecordingSink {
        inner: GraphSink,
        arrivals: Vec<(String, Instant)>,
    }

    impl Sink for RecordingSink {
        fn write_paper(&mut self, paper: &Paper) -> SinkResult<()> {
            self.arrivals.push((paper.id.clone(), Instant::now()));
            self.inner.write_paper(paper)
        }

        fn write_reference(&mut self, citing: &Paper, cited: &Paper) -> SinkResult<()> {
            self.inner.write_reference(citing, cited)
        }

        fn correlated_authors(&self, paper: &Paper) -> SinkResult<Vec<ExistingAuthor>> {
            self.inner.correlated_authors(paper)
        }

        fn write_author(&mut self, paper: &Paper, write: &AuthorWrite) -> SinkResult<()> {
            self.inner.write_author(paper, write)
        }
    }

    /// Graph sink that refuses to store one paper
    struct RejectingSink {
        inner: GraphSink,
        reject: &'static str,
    }

    impl Sink for RejectingSink {
        fn write_paper(&mut self, paper: &Paper) -> SinkResult<()> {
            if paper.id == self.reject {
                return Err(SinkError::NotFound(format!("refused {}", paper.id)));
            }
            self.inner.write_paper(paper)
        }

        fn write_reference(&mut self, citing: &Paper, cited: &Paper) -> SinkResult<()> {
            self.inner.write_reference(citing, cited)
        }

        fn correlated_authors(&self, paper: &Paper) -> SinkResult<Vec<ExistingAuthor>> {
            self.inner.correlated_authors(paper)
        }

        fn write_author(&mut self, paper: &Paper, write: &AuthorWrite) -> SinkResult<()> {
            self.inner.write_author(paper, write)
        }
    }

    fn cycle() -> FakeSource {
        FakeSource::default()
            .paper("a", "Paper A", Some(2010))
            .paper("b", "Paper B", Some(2011))
            .paper("c", "Paper C", Some(2012))
            .paper("d", "Paper D", Some(1990))
            .cites("a", "b")
            .cites("b", "c")
            .cites("c", "a")
            .cites("c", "d")
    }

    fn engine(source: &Arc<FakeSource>) -> CrawlEngine<GraphSink> {
        let source: Arc<dyn PaperSource> = source.clone();
        CrawlEngine::new(source, GraphSink::new())
    }

    #[tokio::test]
    async fn test_expand_twice_is_free() {
        let source = Arc::new(cycle());
        let mut engine = engine(&source);

        let first = engine.expand("a").await;
        assert_eq!(first.fetched, 1);
        assert_eq!(first.new_edges, 2);
        assert_eq!(engine.registry().state("a"), Some(PaperState::Expanded));

        let fetches = source.fetches();
        let second = engine.expand("a").await;
        assert_eq!(second, StepReport::default());
        assert_eq!(source.fetches(), fetches);
    }

    #[tokio::test]
    async fn test_run_to_fixpoint() {
        let source = Arc::new(cycle());
        let mut engine = engine(&source).with_seeds(Seeds::papers(["a"]));

        let summary = engine.run_to_fixpoint(None).await;

        assert!(summary.reached_fixpoint);
        assert_eq!(summary.steps, 3);
        assert_eq!(summary.totals.new_edges, 4);
        assert_eq!(summary.totals.papers_written, 4);
        assert_eq!(summary.totals.edges_written, 4);
        assert_eq!(engine.registry().pending_edges(), 0);
        assert!(engine.registry().frontier().is_empty());

        let sink = engine.into_sink();
        assert_eq!(sink.papers().len(), 4);
        assert_eq!(sink.edges().len(), 4);
    }

    #[tokio::test]
    async fn test_step_budget() {
        let source = Arc::new(cycle());
        let mut engine = engine(&source).with_seeds(Seeds::papers(["a"]));

        let summary = engine.run_to_fixpoint(Some(1)).await;

        assert_eq!(summary.steps, 1);
        assert!(!summary.reached_fixpoint);
        assert_eq!(engine.registry().frontier(), vec!["b".to_string(), "c".to_string()]);
    }

    #[tokio::test]
    async fn test_streaming_emission() {
        let source = Arc::new(
            FakeSource::default()
                .paper("fast", "Fast", None)
                .paper("medium", "Medium", None)
                .paper("slow", "Slow", None)
                .delay("fast", 10)
                .delay("medium", 50)
                .delay("slow", 90),
        );
        let dyn_source: Arc<dyn PaperSource> = source.clone();
        let mut engine = CrawlEngine::new(dyn_source, RecordingSink::default())
            .with_seeds(Seeds::papers(["slow", "medium", "fast"]));

        let start = Instant::now();
        let report = engine.run_step().await;
        assert_eq!(report.papers_written, 3);

        let arrivals = &engine.sink().arrivals;
        let order: Vec<&str> = arrivals.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(order, vec!["fast", "medium", "slow"]);

        let slow_done = source.finished.lock().unwrap()["slow"];
        let first_write = arrivals[0].1;
        assert!(first_write < slow_done);
        assert!(first_write.duration_since(start) < Duration::from_millis(90));
    }

    #[tokio::test]
    async fn test_filtered_papers_are_terminal() {
        let source = Arc::new(cycle());
        let mut engine = engine(&source)
            .with_filter(Arc::new(YearFilter::new(2000)))
            .with_seeds(Seeds::papers(["a"]));

        engine.run_to_fixpoint(None).await;

        assert_eq!(engine.registry().state("d"), Some(PaperState::Filtered));
        let sink = engine.into_sink();
        assert_eq!(sink.papers().len(), 3);
        assert!(sink.paper_by_id("d").is_none());
        assert_eq!(sink.edges().len(), 3);
    }

    #[tokio::test]
    async fn test_unavailable_paper_stays_unknown() {
        let source = Arc::new(FakeSource::default().paper("a", "Paper A", None).cites("a", "gone"));
        let mut engine = engine(&source).with_seeds(Seeds::papers(["a", "missing"]));

        let report = engine.run_step().await;

        assert_eq!(report.unavailable, 1);
        assert_eq!(engine.registry().state("missing"), Some(PaperState::Unknown));
        assert_eq!(engine.sink().papers().len(), 1);
    }

    #[tokio::test]
    async fn test_requested_id_is_aliased() {
        let mut fake = FakeSource::default().paper("p1", "Resolved Paper", None);
        fake.aliases
            .insert("DOI:10.1/x".to_string(), "p1".to_string());
        let source = Arc::new(fake);
        let mut engine = engine(&source).with_seeds(Seeds::papers(["DOI:10.1/x"]));

        let summary = engine.run_to_fixpoint(None).await;

        assert!(summary.reached_fixpoint);
        assert_eq!(engine.registry().state("p1"), Some(PaperState::Expanded));
        assert_eq!(engine.registry().len(), 1);
        assert!(engine.sink().paper_by_id("p1").is_some());
    }

    #[tokio::test]
    async fn test_title_and_author_seeds() {
        let mut fake = cycle();
        fake.by_author
            .insert("auth".to_string(), vec!["c".to_string()]);
        let source = Arc::new(fake);
        let mut engine = engine(&source).with_seeds(Seeds {
            paper_ids: Vec::new(),
            author_ids: vec!["auth".to_string(), "nobody".to_string()],
            titles: vec!["paper  a".to_string(), "Unknown Title".to_string()],
        });

        let report = engine.run_step().await;

        assert_eq!(report.attempted, 2);
        assert_eq!(engine.registry().state("a"), Some(PaperState::Expanded));
        assert_eq!(engine.registry().state("c"), Some(PaperState::Expanded));
    }

    #[tokio::test]
    async fn test_authors_reach_the_sink() {
        let source = Arc::new(
            cycle()
                .authors(
                    "a",
                    vec![
                        Author::new(Some("x1"), Some("Xu Li")),
                        Author::new(Some("y2"), Some("Yara Smith")),
                    ],
                )
                .authors("b", vec![Author::new(Some("x1"), Some("Xu Li"))]),
        );
        let mut engine = engine(&source).with_seeds(Seeds::papers(["a"]));

        engine.run_to_fixpoint(None).await;

        let sink = engine.into_sink();
        assert_eq!(sink.authors().len(), 2);
        let a = Paper::new("a", "Paper A");
        let b = Paper::new("b", "Paper B");
        assert_eq!(sink.linked_author_ids(&a.title_hash()), vec!["x1", "y2"]);
        assert_eq!(sink.linked_author_ids(&b.title_hash()), vec!["x1"]);
    }

    #[tokio::test]
    async fn test_sink_failure_skips_only_that_paper() {
        let source = Arc::new(cycle());
        let dyn_source: Arc<dyn PaperSource> = source.clone();
        let sink = RejectingSink {
            inner: GraphSink::new(),
            reject: "b",
        };
        let mut engine = CrawlEngine::new(dyn_source, sink).with_seeds(Seeds::papers(["a", "b", "c"]));

        let report = engine.run_step().await;

        assert_eq!(report.attempted, 3);
        assert_eq!(report.sink_errors, 1);
        assert_eq!(report.papers_written, 2);
        // Only c -> a has both endpoints stored
        assert_eq!(report.edges_written, 1);

        let sink = &engine.sink().inner;
        assert!(sink.paper_by_id("a").is_some());
        assert!(sink.paper_by_id("b").is_none());
        assert!(sink.paper_by_id("c").is_some());
        let (a, c) = (Paper::new("a", "Paper A"), Paper::new("c", "Paper C"));
        assert!(sink.edges().contains(&(c.title_hash(), a.title_hash())));
    }
}
