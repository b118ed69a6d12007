//! Database schema for the SQLite sink

/// SQL schema for the citation graph
pub const SCHEMA_SQL: &str = r#"
-- One row per paper, keyed by normalized title hash
CREATE TABLE IF NOT EXISTS papers (
    title_hash TEXT PRIMARY KEY,
    paper_id TEXT,
    title TEXT NOT NULL,
    year INTEGER,
    publication_date TEXT,
    doi TEXT,
    dblp_key TEXT,
    external_ids TEXT NOT NULL DEFAULT '{}',
    first_seen TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_papers_paper_id ON papers(paper_id);
CREATE INDEX IF NOT EXISTS idx_papers_doi ON papers(doi);

-- Directed citation edges
CREATE TABLE IF NOT EXISTS citations (
    citing TEXT NOT NULL REFERENCES papers(title_hash),
    cited TEXT NOT NULL REFERENCES papers(title_hash),
    PRIMARY KEY (citing, cited)
);

CREATE INDEX IF NOT EXISTS idx_citations_cited ON citations(cited);

-- Authors; author_id is the source id when known
CREATE TABLE IF NOT EXISTS authors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    author_id TEXT UNIQUE,
    name TEXT,
    name_key TEXT,
    external_ids TEXT NOT NULL DEFAULT '{}'
);

CREATE INDEX IF NOT EXISTS idx_authors_name_key ON authors(name_key);

-- Authorship links
CREATE TABLE IF NOT EXISTS writes (
    author INTEGER NOT NULL REFERENCES authors(id),
    paper TEXT NOT NULL REFERENCES papers(title_hash),
    PRIMARY KEY (author, paper)
);

CREATE INDEX IF NOT EXISTS idx_writes_paper ON writes(paper);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize_schema(&conn).unwrap();
        let result = initialize_schema(&conn);

        assert!(result.is_ok());
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        for table in ["papers", "citations", "authors", "writes"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }
}
