//! SQLite-backed document index.
//!
//! One record per filename; re-processing a file replaces its category and
//! summary. Every access goes through a single connection behind a mutex, so
//! writes are serialized and a reader never observes a half-written row.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::schema::SCHEMA_SQL;
use crate::types::*;
use docsort_core::{Error, Result};

/// File name of the index database inside the index directory.
pub const DB_FILE: &str = "documents.db";

/// Durable filename → (category, summary) index.
pub struct DocumentIndex {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

fn db_err(e: rusqlite::Error) -> Error {
    Error::IndexUnavailable(e.to_string())
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl DocumentIndex {
    /// Open or create the index in `db_dir` (file `db_dir/documents.db`).
    pub fn open(db_dir: impl AsRef<Path>) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::IndexUnavailable(e.to_string()))?;
        let db_path = db_dir.join(DB_FILE);

        let conn = Self::create_connection(&db_path)?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::IndexUnavailable(format!("Schema init failed: {}", e)))?;

        let index = Self {
            conn: Mutex::new(conn),
            db_path,
        };

        info!(
            "DocumentIndex initialized: {} documents, path={}",
            index.count()?,
            index.db_path.display()
        );

        Ok(index)
    }

    fn create_connection(db_path: &Path) -> Result<Connection> {
        let conn = Connection::open(db_path).map_err(db_err)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(db_err)?;
        Ok(conn)
    }

    /// Path of the database file.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Insert or replace the record for `filename` (last write wins).
    pub fn upsert(&self, filename: &str, category: &str, summary: &str) -> Result<()> {
        let now = now_millis();
        let conn = self.conn.lock();
        conn.prepare_cached(
            "INSERT INTO documents (filename, category, summary, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(filename) DO UPDATE SET
                category = excluded.category,
                summary = excluded.summary,
                updated_at = excluded.updated_at",
        )
        .map_err(db_err)?
        .execute(params![filename, category, summary, now])
        .map_err(db_err)?;
        debug!("Indexed {} as {}", filename, category);
        Ok(())
    }

    /// Get the record for a filename.
    pub fn get(&self, filename: &str) -> Result<Option<DocumentRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT filename, category, summary, created_at, updated_at
                 FROM documents WHERE filename = ?1",
            )
            .map_err(db_err)?;
        let record = stmt
            .query_row(params![filename], Self::row_to_record)
            .optional()
            .map_err(db_err)?;
        Ok(record)
    }

    /// All records in insertion order.
    pub fn list(&self) -> Result<Vec<DocumentRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT filename, category, summary, created_at, updated_at
                 FROM documents ORDER BY id ASC",
            )
            .map_err(db_err)?;
        let rows = stmt.query_map([], Self::row_to_record).map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    /// Records whose filename, category or summary contains `query`,
    /// ignoring case. An empty query matches everything.
    ///
    /// Matching is done on Unicode-lowercased text rather than with SQL
    /// `LIKE`, whose case folding only covers ASCII.
    pub fn search(&self, query: &str) -> Result<Vec<DocumentRecord>> {
        let needle = query.trim().to_lowercase();
        let records = self.list()?;
        if needle.is_empty() {
            return Ok(records);
        }
        Ok(records
            .into_iter()
            .filter(|r| {
                r.filename.to_lowercase().contains(&needle)
                    || r.category.to_lowercase().contains(&needle)
                    || r.summary.to_lowercase().contains(&needle)
            })
            .collect())
    }

    /// Every (category, summary) pair, in insertion order.
    ///
    /// The uncapped form of [`history`](Self::history). The pipeline reads
    /// the capped one.
    pub fn all(&self) -> Result<Vec<HistoryEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT category, summary FROM documents ORDER BY id ASC")
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(HistoryEntry {
                    category: row.get(0)?,
                    summary: row.get(1)?,
                })
            })
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    /// The `limit` most recently updated pairs, oldest first.
    pub fn history(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT category, summary FROM documents
                 ORDER BY updated_at DESC, id DESC LIMIT ?1",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(HistoryEntry {
                    category: row.get(0)?,
                    summary: row.get(1)?,
                })
            })
            .map_err(db_err)?;
        let mut entries = rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)?;
        entries.reverse();
        Ok(entries)
    }

    /// Count indexed documents.
    pub fn count(&self) -> Result<i64> {
        let conn = self.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
            .map_err(db_err)
    }

    /// Get index statistics.
    pub fn stats(&self) -> Result<IndexStats> {
        let total_documents = self.count()?;

        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT category, COUNT(*) FROM documents GROUP BY category ORDER BY category",
            )
            .map_err(db_err)?;
        let categories = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<(String, i64)>>>()
            .map_err(db_err)?;
        drop(stmt);
        drop(conn);

        let db_size = std::fs::metadata(&self.db_path)
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(IndexStats {
            total_documents,
            categories,
            db_path: self.db_path.to_string_lossy().to_string(),
            db_size_mb: db_size as f64 / (1024.0 * 1024.0),
        })
    }

    fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<DocumentRecord> {
        Ok(DocumentRecord {
            filename: row.get(0)?,
            category: row.get(1)?,
            summary: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn test_index() -> (DocumentIndex, TempDir) {
        let dir = TempDir::new().unwrap();
        let index = DocumentIndex::open(dir.path()).unwrap();
        (index, dir)
    }

    #[test]
    fn test_upsert_replaces_existing_record() {
        let (index, _dir) = test_index();
        index.upsert("police.pdf", "Auto", "Erste Fassung.").unwrap();
        index
            .upsert("police.pdf", "Versicherung", "Zweite Fassung.")
            .unwrap();

        assert_eq!(index.count().unwrap(), 1);
        let record = index.get("police.pdf").unwrap().unwrap();
        assert_eq!(record.category, "Versicherung");
        assert_eq!(record.summary, "Zweite Fassung.");
        assert!(record.updated_at >= record.created_at);
    }

    #[test]
    fn test_search_matches_any_field_case_insensitive() {
        let (index, _dir) = test_index();
        index
            .upsert("Zeugnis_2023.pdf", "Schule", "Halbjahreszeugnis der Klasse 5.")
            .unwrap();
        index
            .upsert("kfz.pdf", "Auto", "Rechnung der Werkstatt vom 03.04.2024.")
            .unwrap();
        index
            .upsert("miete.pdf", "Immobile - Saarbrückerplatz", "Mieterhöhung.")
            .unwrap();

        let hits = index.search("zeugnis").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].filename, "Zeugnis_2023.pdf");

        let hits = index.search("AUTO").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].filename, "kfz.pdf");

        let hits = index.search("werkstatt").unwrap();
        assert_eq!(hits.len(), 1);

        // Non-ASCII case folding.
        let hits = index.search("SAARBRÜCKER").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].filename, "miete.pdf");

        assert!(index.search("steuer").unwrap().is_empty());
    }

    #[test]
    fn test_empty_query_returns_all_in_insertion_order() {
        let (index, _dir) = test_index();
        index.upsert("a.pdf", "Auto", "").unwrap();
        index.upsert("b.pdf", "Schule", "").unwrap();
        index.upsert("c.pdf", "Auto", "").unwrap();
        // Updating an existing record keeps its position.
        index.upsert("a.pdf", "Schule", "neu").unwrap();

        let names: Vec<String> = index
            .search("  ")
            .unwrap()
            .into_iter()
            .map(|r| r.filename)
            .collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf", "c.pdf"]);
    }

    #[test]
    fn test_all_reflects_prior_upserts() {
        let (index, _dir) = test_index();
        assert!(index.all().unwrap().is_empty());
        index.upsert("a.pdf", "Auto", "Kaufvertrag.").unwrap();
        let all = index.all().unwrap();
        assert_eq!(
            all,
            vec![HistoryEntry {
                category: "Auto".into(),
                summary: "Kaufvertrag.".into()
            }]
        );
    }

    #[test]
    fn test_history_limit_keeps_most_recent() {
        let (index, _dir) = test_index();
        for i in 0..5 {
            index
                .upsert(&format!("{i}.pdf"), "Auto", &format!("summary {i}"))
                .unwrap();
        }
        let history = index.history(2).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].summary, "summary 3");
        assert_eq!(history[1].summary, "summary 4");
        assert!(index.history(0).unwrap().is_empty());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let index = DocumentIndex::open(dir.path()).unwrap();
            index.upsert("a.pdf", "Auto", "x").unwrap();
        }
        let index = DocumentIndex::open(dir.path()).unwrap();
        assert_eq!(index.get("a.pdf").unwrap().unwrap().category, "Auto");
    }

    #[test]
    fn test_concurrent_upserts_do_not_corrupt() {
        let (index, _dir) = test_index();
        let index = Arc::new(index);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let index = Arc::clone(&index);
                std::thread::spawn(move || {
                    for i in 0..20 {
                        index
                            .upsert(&format!("t{t}-{i}.pdf"), "Auto", "s")
                            .unwrap();
                        index.upsert("shared.pdf", &format!("C{t}"), "s").unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(index.count().unwrap(), 8 * 20 + 1);
        assert_eq!(index.search("shared").unwrap().len(), 1);
    }

    #[test]
    fn test_stats() {
        let (index, _dir) = test_index();
        index.upsert("a.pdf", "Auto", "").unwrap();
        index.upsert("b.pdf", "Auto", "").unwrap();
        index.upsert("c.pdf", "Schule", "").unwrap();

        let stats = index.stats().unwrap();
        assert_eq!(stats.total_documents, 3);
        assert_eq!(
            stats.categories,
            vec![("Auto".to_string(), 2), ("Schule".to_string(), 1)]
        );
        assert!(stats.db_path.ends_with(DB_FILE));
    }
}
