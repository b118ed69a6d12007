//! SQLite sink implementation
//!
//! Papers are keyed by title hash so the same paper reached through a
//! reference listing, a citation listing or a direct fetch lands on one row.
//! Upserts merge with `COALESCE` and `json_patch`, newer data never erases
//! older data.

use crate::model::{normalize_name, Paper};
use crate::reconcile::{AuthorFields, AuthorKey, AuthorWrite, ExistingAuthor};
use crate::sink::schema::initialize_schema;
use crate::sink::stats::SinkStatistics;
use crate::sink::traits::{Sink, SinkError, SinkResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;

/// SQLite-backed citation graph
pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    /// Opens or creates the database at `path`
    pub fn open(path: &Path) -> SinkResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> SinkResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Counts of everything stored so far
    pub fn statistics(&self) -> SinkResult<SinkStatistics> {
        let count = |sql: &str| -> SinkResult<u64> {
            let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as u64)
        };

        let (earliest_year, latest_year): (Option<i32>, Option<i32>) = self.conn.query_row(
            "SELECT MIN(year), MAX(year) FROM papers",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(SinkStatistics {
            papers: count("SELECT COUNT(*) FROM papers")?,
            citations: count("SELECT COUNT(*) FROM citations")?,
            authors: count("SELECT COUNT(*) FROM authors")?,
            unidentified_authors: count("SELECT COUNT(*) FROM authors WHERE author_id IS NULL")?,
            author_links: count("SELECT COUNT(*) FROM writes")?,
            earliest_year,
            latest_year,
        })
    }

    /// Source paper id stored under a title hash
    pub fn paper_id(&self, title_hash: &str) -> SinkResult<Option<String>> {
        let id = self
            .conn
            .query_row(
                "SELECT paper_id FROM papers WHERE title_hash = ?1",
                params![title_hash],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id.flatten())
    }

    /// Source author ids linked to a paper, sorted
    pub fn linked_author_ids(&self, paper: &Paper) -> SinkResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT a.author_id FROM authors a
             JOIN writes w ON w.author = a.id
             WHERE w.paper = ?1 AND a.author_id IS NOT NULL
             ORDER BY a.author_id",
        )?;
        let ids = stmt
            .query_map(params![paper.title_hash()], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    /// Source ids of every stored paper, sorted
    pub fn paper_ids(&self) -> SinkResult<Vec<String>> {
        self.column("SELECT paper_id FROM papers WHERE paper_id IS NOT NULL ORDER BY paper_id")
    }

    /// Source ids of every stored author, sorted
    pub fn author_ids(&self) -> SinkResult<Vec<String>> {
        self.column("SELECT author_id FROM authors WHERE author_id IS NOT NULL ORDER BY author_id")
    }

    fn column(&self, sql: &str) -> SinkResult<Vec<String>> {
        let mut stmt = self.conn.prepare(sql)?;
        let values = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(values)
    }

    /// Inserts an author with no source id and links it to `paper`
    ///
    /// Returns the node identity of the new record.
    #[cfg(test)]
    fn insert_unidentified_author(&mut self, paper: &Paper, name: &str) -> SinkResult<String> {
        self.conn.execute(
            "INSERT INTO authors (name, name_key) VALUES (?1, ?2)",
            params![name, normalize_name(name)],
        )?;
        let row = self.conn.last_insert_rowid();
        self.conn.execute(
            "INSERT OR IGNORE INTO writes (author, paper) VALUES (?1, ?2)",
            params![row, paper.title_hash()],
        )?;
        Ok(row.to_string())
    }
}

fn read_existing(row: &Row<'_>) -> rusqlite::Result<(i64, ExistingAuthor)> {
    let node: i64 = row.get(0)?;
    Ok((
        node,
        ExistingAuthor {
            node: node.to_string(),
            author_id: row.get(1)?,
            name: row.get(2)?,
        },
    ))
}

fn author_row(conn: &Connection, key: &AuthorKey) -> SinkResult<Option<i64>> {
    let row = match key {
        AuthorKey::SourceId(id) => conn
            .query_row(
                "SELECT id FROM authors WHERE author_id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?,
        AuthorKey::Node(node) => {
            let Ok(node) = node.parse::<i64>() else {
                return Ok(None);
            };
            conn.query_row(
                "SELECT id FROM authors WHERE id = ?1",
                params![node],
                |row| row.get(0),
            )
            .optional()?
        }
    };
    Ok(row)
}

fn apply_fields(conn: &Connection, row: i64, fields: &AuthorFields) -> SinkResult<()> {
    if fields.is_empty() {
        return Ok(());
    }
    let external_ids = serde_json::to_string(&fields.external_ids)?;
    conn.execute(
        "UPDATE authors SET
            author_id = COALESCE(author_id, ?2),
            name = COALESCE(?3, name),
            name_key = COALESCE(?4, name_key),
            external_ids = json_patch(external_ids, ?5)
         WHERE id = ?1",
        params![
            row,
            fields.author_id,
            fields.name,
            fields.name.as_deref().map(normalize_name),
            external_ids
        ],
    )?;
    Ok(())
}

impl Sink for SqliteSink {
    fn write_paper(&mut self, paper: &Paper) -> SinkResult<()> {
        let now = Utc::now().to_rfc3339();
        let external_ids = serde_json::to_string(&paper.external_ids)?;
        let paper_id = Some(paper.id.as_str()).filter(|id| !id.is_empty());

        self.conn.execute(
            "INSERT INTO papers (title_hash, paper_id, title, year, publication_date, doi, dblp_key, external_ids, first_seen, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
             ON CONFLICT(title_hash) DO UPDATE SET
                paper_id = COALESCE(papers.paper_id, excluded.paper_id),
                title = excluded.title,
                year = COALESCE(excluded.year, papers.year),
                publication_date = COALESCE(excluded.publication_date, papers.publication_date),
                doi = COALESCE(excluded.doi, papers.doi),
                dblp_key = COALESCE(excluded.dblp_key, papers.dblp_key),
                external_ids = json_patch(papers.external_ids, excluded.external_ids),
                updated_at = excluded.updated_at",
            params![
                paper.title_hash(),
                paper_id,
                paper.title,
                paper.year,
                paper.date.map(|d| d.to_string()),
                paper.doi(),
                paper.dblp_key(),
                external_ids,
                now
            ],
        )?;
        Ok(())
    }

    fn write_reference(&mut self, citing: &Paper, cited: &Paper) -> SinkResult<()> {
        let (citing, cited) = (citing.title_hash(), cited.title_hash());
        if citing == cited {
            tracing::debug!("Skipping self-citation on {}", citing);
            return Ok(());
        }
        self.conn.execute(
            "INSERT OR IGNORE INTO citations (citing, cited) VALUES (?1, ?2)",
            params![citing, cited],
        )?;
        Ok(())
    }

    fn correlated_authors(&self, paper: &Paper) -> SinkResult<Vec<ExistingAuthor>> {
        let mut found: BTreeMap<i64, ExistingAuthor> = BTreeMap::new();

        let mut linked = self.conn.prepare(
            "SELECT a.id, a.author_id, a.name FROM authors a
             JOIN writes w ON w.author = a.id
             WHERE w.paper = ?1",
        )?;
        for row in linked.query_map(params![paper.title_hash()], read_existing)? {
            let (node, existing) = row?;
            found.entry(node).or_insert(existing);
        }

        let mut by_id = self
            .conn
            .prepare("SELECT id, author_id, name FROM authors WHERE author_id = ?1")?;
        let mut by_name = self.conn.prepare(
            "SELECT id, author_id, name FROM authors WHERE name_key = ?1 AND author_id IS NULL",
        )?;
        for author in paper.authors.iter().flatten() {
            if let Some(id) = author.id.as_deref() {
                if let Some((node, existing)) =
                    by_id.query_row(params![id], read_existing).optional()?
                {
                    found.entry(node).or_insert(existing);
                }
            }
            if let Some(name) = author.normalized_name() {
                for row in by_name.query_map(params![name], read_existing)? {
                    let (node, existing) = row?;
                    found.entry(node).or_insert(existing);
                }
            }
        }

        Ok(found.into_values().collect())
    }

    fn write_author(&mut self, paper: &Paper, write: &AuthorWrite) -> SinkResult<()> {
        let paper_hash = paper.title_hash();
        let tx = self.conn.transaction()?;

        if let Some(unlink) = &write.unlink {
            if let Some(row) = author_row(&tx, unlink)? {
                tx.execute(
                    "DELETE FROM writes WHERE author = ?1 AND paper = ?2",
                    params![row, paper_hash],
                )?;
            }
        }

        let row = match &write.key {
            AuthorKey::SourceId(id) => match author_row(&tx, &write.key)? {
                Some(row) => row,
                None => {
                    tx.execute("INSERT INTO authors (author_id) VALUES (?1)", params![id])?;
                    tx.last_insert_rowid()
                }
            },
            AuthorKey::Node(node) => {
                let row = author_row(&tx, &write.key)?
                    .ok_or_else(|| SinkError::NotFound(format!("author node {}", node)))?;
                let owner = match &write.fields.author_id {
                    Some(id) => author_row(&tx, &AuthorKey::SourceId(id.clone()))?,
                    None => None,
                };
                // A source id already owned by another record takes that
                // record, and the name-only record lets go of the paper
                match owner {
                    Some(owner) if owner != row => {
                        tx.execute(
                            "DELETE FROM writes WHERE author = ?1 AND paper = ?2",
                            params![row, paper_hash],
                        )?;
                        owner
                    }
                    _ => row,
                }
            }
        };

        apply_fields(&tx, row, &write.fields)?;
        tx.execute(
            "INSERT OR IGNORE INTO writes (author, paper) VALUES (?1, ?2)",
            params![row, paper_hash],
        )?;
        tx.commit()?;
        Ok(())
    }
}
