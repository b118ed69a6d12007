//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the bibliographic API and run
//! the full crawl cycle end-to-end, from a config file to a populated sink.

use citeweave::config::load_config;
use citeweave::crawler::crawl;
use citeweave::SqliteSink;
use serde_json::{json, Value};
use std::path::PathBuf;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct FakePaper {
    id: &'static str,
    title: &'static str,
    year: i32,
    authors: &'static [(&'static str, &'static str)],
}

const PAPERS: &[FakePaper] = &[
    FakePaper {
        id: "p1",
        title: "Attention Is All You Need",
        year: 2017,
        authors: &[("a1", "Ashish Vaswani"), ("a2", "Noam Shazeer")],
    },
    FakePaper {
        id: "p2",
        title: "Neural Machine Translation by Jointly Learning to Align and Translate",
        year: 2014,
        authors: &[("a3", "Dzmitry Bahdanau")],
    },
    FakePaper {
        id: "p3",
        title: "BERT: Pre-training of Deep Bidirectional Transformers",
        year: 2018,
        authors: &[("a4", "Jacob Devlin"), ("a1", "Ashish Vaswani")],
    },
];

/// (citing, cited)
const CITES: &[(&str, &str)] = &[("p1", "p2"), ("p3", "p1"), ("p3", "p2")];

fn brief(id: &str) -> Value {
    let paper = PAPERS.iter().find(|p| p.id == id).unwrap();
    json!({"paperId": paper.id, "title": paper.title, "year": paper.year})
}

/// Mounts every endpoint of the fake graph; detail endpoints expect one hit
async fn mount_graph(server: &MockServer) {
    for paper in PAPERS {
        let authors: Vec<Value> = paper
            .authors
            .iter()
            .map(|(id, name)| json!({"authorId": id, "name": name, "externalIds": {}}))
            .collect();

        Mock::given(method("GET"))
            .and(path(format!("/paper/{}", paper.id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "paperId": paper.id,
                "title": paper.title,
                "year": paper.year,
                "externalIds": {"DOI": format!("10.0/{}", paper.id)},
                "authors": authors,
            })))
            .expect(1)
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path(format!("/paper/{}/authors", paper.id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": authors })))
            .mount(server)
            .await;

        let references: Vec<Value> = CITES
            .iter()
            .filter(|(citing, _)| *citing == paper.id)
            .map(|(_, cited)| json!({ "citedPaper": brief(cited) }))
            .collect();
        Mock::given(method("GET"))
            .and(path(format!("/paper/{}/references", paper.id)))
            .and(query_param("limit", "1000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": references })))
            .mount(server)
            .await;

        let citations: Vec<Value> = CITES
            .iter()
            .filter(|(_, cited)| *cited == paper.id)
            .map(|(citing, _)| json!({ "citingPaper": brief(citing) }))
            .collect();
        Mock::given(method("GET"))
            .and(path(format!("/paper/{}/citations", paper.id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": citations })))
            .mount(server)
            .await;
    }
}

fn write_config(dir: &TempDir, server: &MockServer, crawl: &str, output: &str) -> PathBuf {
    let config_path = dir.path().join("citeweave.toml");
    let content = format!(
        r#"
[source]
base-url = "{}"
max-concurrent-requests = 4

[cache]
directory = "{}"

[crawl]
{}

[output]
{}
"#,
        server.uri(),
        dir.path().join("cache").display(),
        crawl,
        output
    );
    std::fs::write(&config_path, content).unwrap();
    config_path
}

#[tokio::test]
async fn test_full_crawl_into_sqlite() {
    let server = MockServer::start().await;
    mount_graph(&server).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("graph.db");
    let config_path = write_config(
        &dir,
        &server,
        r#"paper-ids = ["p1"]"#,
        &format!("sink = \"sqlite\"\ndatabase-path = \"{}\"", db_path.display()),
    );

    let config = load_config(&config_path).unwrap();
    let summary = crawl(config).await.unwrap();

    assert!(summary.reached_fixpoint);
    assert_eq!(summary.totals.papers_written, 3);
    assert_eq!(summary.totals.edges_written, 3);

    let sink = SqliteSink::open(&db_path).unwrap();
    let stats = sink.statistics().unwrap();
    assert_eq!(stats.papers, 3);
    assert_eq!(stats.citations, 3);
    assert_eq!(stats.authors, 4);
    assert_eq!(stats.author_links, 5);
    assert_eq!(stats.earliest_year, Some(2014));
}

#[tokio::test]
async fn test_second_run_is_served_from_cache() {
    let server = MockServer::start().await;
    mount_graph(&server).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("graph.db");
    let config_path = write_config(
        &dir,
        &server,
        r#"paper-ids = ["p1"]"#,
        &format!("sink = \"sqlite\"\ndatabase-path = \"{}\"", db_path.display()),
    );

    crawl(load_config(&config_path).unwrap()).await.unwrap();
    // Paper detail mocks expect exactly one hit each, verified on drop
    crawl(load_config(&config_path).unwrap()).await.unwrap();

    let sink = SqliteSink::open(&db_path).unwrap();
    let stats = sink.statistics().unwrap();
    assert_eq!(stats.papers, 3);
    assert_eq!(stats.citations, 3);
    assert_eq!(stats.author_links, 5);
}

#[tokio::test]
async fn test_title_seed_into_json_graph() {
    let server = MockServer::start().await;
    mount_graph(&server).await;
    Mock::given(method("GET"))
        .and(path("/paper/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [brief("p3")]
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let json_path = dir.path().join("graph.json");
    let config_path = write_config(
        &dir,
        &server,
        "titles = [\"BERT: pre-training of deep bidirectional transformers\"]\nmin-year = 2015",
        &format!("sink = \"json\"\njson-path = \"{}\"", json_path.display()),
    );

    let summary = crawl(load_config(&config_path).unwrap()).await.unwrap();
    assert_eq!(summary.totals.filtered, 1);

    let graph: Value = serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    let nodes = graph["nodes"].as_object().unwrap();
    assert_eq!(nodes.len(), 2);

    assert_eq!(nodes["p3"]["title"], PAPERS[2].title);
    assert_eq!(graph["edges"], json!([["p3", "p1"]]));
    assert!(!dir.path().join("graph.db").exists());
}

#[tokio::test]
async fn test_rerun_resumes_from_store() {
    let server = MockServer::start().await;
    mount_graph(&server).await;
    for author in ["a1", "a2"] {
        Mock::given(method("GET"))
            .and(path(format!("/author/{}/papers", author)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .mount(&server)
            .await;
    }

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("graph.db");
    let output = format!("sink = \"sqlite\"\ndatabase-path = \"{}\"", db_path.display());

    let config_path = write_config(&dir, &server, "paper-ids = [\"p1\"]\nmax-steps = 1", &output);
    let first = crawl(load_config(&config_path).unwrap()).await.unwrap();
    assert!(!first.reached_fixpoint);
    let stats = SqliteSink::open(&db_path).unwrap().statistics().unwrap();
    assert_eq!(stats.papers, 1);
    assert_eq!(stats.citations, 0);

    // No configured seeds: everything starts from what the database holds
    let config_path = write_config(&dir, &server, "from-store = true", &output);
    let second = crawl(load_config(&config_path).unwrap()).await.unwrap();
    assert!(second.reached_fixpoint);

    let sink = SqliteSink::open(&db_path).unwrap();
    let stats = sink.statistics().unwrap();
    assert_eq!(stats.papers, 3);
    assert_eq!(stats.citations, 3);
    assert_eq!(sink.paper_ids().unwrap(), vec!["p1", "p2", "p3"]);
}
