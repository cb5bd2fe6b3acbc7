//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::model::{PostDate, PostDetail};
use crate::output::SectionReport;
use crate::state::SectionStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus, SectionReportRecord, UpsertOutcome};
use crate::HarvestError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use sha2::{Digest, Sha256};
use std::path::Path;

const POST_COLUMNS: &str =
    "url, slug, section, title, date, date_canonical, categories, tags, content";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// Missing parent directories are created.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(HarvestError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

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
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// Hash over every stored field of a post
fn content_hash(post: &PostDetail) -> StorageResult<String> {
    let encoded = serde_json::to_vec(post)?;
    Ok(hex::encode(Sha256::digest(&encoded)))
}

fn split_date(date: Option<&PostDate>) -> (Option<&str>, bool) {
    match date {
        Some(d) => (Some(d.as_str()), d.is_canonical()),
        None => (None, false),
    }
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<(PostDetail, String, String)> {
    let date: Option<String> = row.get(4)?;
    let canonical: bool = row.get(5)?;
    let post = PostDetail {
        url: row.get(0)?,
        slug: row.get(1)?,
        section: row.get(2)?,
        title: row.get(3)?,
        date: date.map(|d| {
            if canonical {
                PostDate::Canonical(d)
            } else {
                PostDate::Raw(d)
            }
        }),
        categories: Vec::new(),
        tags: Vec::new(),
        content: row.get(8)?,
    };
    Ok((post, row.get(6)?, row.get(7)?))
}

/// Decodes the JSON list columns of a row read by `post_from_row`
fn finish_post(parts: (PostDetail, String, String)) -> StorageResult<PostDetail> {
    let (mut post, categories, tags) = parts;
    post.categories = serde_json::from_str(&categories)?;
    post.tags = serde_json::from_str(&tags)?;
    Ok(post)
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Running),
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;

        Ok(run)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Posts =====

    fn upsert_post(&mut self, post: &PostDetail) -> StorageResult<UpsertOutcome> {
        let hash = content_hash(post)?;
        let categories = serde_json::to_string(&post.categories)?;
        let tags = serde_json::to_string(&post.tags)?;
        let (date, date_canonical) = split_date(post.date.as_ref());
        let now = Utc::now().to_rfc3339();

        let tx = self.conn.transaction()?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT content_hash FROM posts WHERE url = ?1",
                params![post.url],
                |row| row.get(0),
            )
            .optional()?;

        let outcome = match existing {
            None => {
                tx.execute(
                    "INSERT INTO posts (url, slug, section, title, date, date_canonical,
                     categories, tags, content, content_hash, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
                    params![
                        post.url,
                        post.slug,
                        post.section,
                        post.title,
                        date,
                        date_canonical,
                        categories,
                        tags,
                        post.content,
                        hash,
                        now
                    ],
                )?;
                UpsertOutcome::Inserted
            }
            Some(stored) if stored == hash => UpsertOutcome::Unchanged,
            Some(_) => {
                tx.execute(
                    "UPDATE posts SET slug = ?2, section = ?3, title = ?4, date = ?5,
                     date_canonical = ?6, categories = ?7, tags = ?8, content = ?9,
                     content_hash = ?10, updated_at = ?11
                     WHERE url = ?1",
                    params![
                        post.url,
                        post.slug,
                        post.section,
                        post.title,
                        date,
                        date_canonical,
                        categories,
                        tags,
                        post.content,
                        hash,
                        now
                    ],
                )?;
                UpsertOutcome::Updated
            }
        };

        tx.commit()?;
        Ok(outcome)
    }

    fn get_post_by_url(&self, url: &str) -> StorageResult<Option<PostDetail>> {
        let sql = format!("SELECT {} FROM posts WHERE url = ?1", POST_COLUMNS);
        let parts = self
            .conn
            .query_row(&sql, params![url], post_from_row)
            .optional()?;

        parts.map(finish_post).transpose()
    }

    fn list_posts(&self, section: Option<&str>) -> StorageResult<Vec<PostDetail>> {
        let sql = format!(
            "SELECT {} FROM posts WHERE (?1 IS NULL OR section = ?1) ORDER BY section, date, url",
            POST_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![section], post_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(finish_post).collect()
    }

    fn known_urls(&self, section: Option<&str>) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT url FROM posts WHERE (?1 IS NULL OR section = ?1) ORDER BY url")?;
        let urls = stmt
            .query_map(params![section], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(urls)
    }

    // ===== Section Reports =====

    fn record_section_report(
        &mut self,
        run_id: i64,
        report: &SectionReport,
    ) -> StorageResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO section_reports (run_id, section, status, pages_visited,
             summaries_discovered, duplicates_skipped, rejected_entries, saved, repaired, failed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                run_id,
                report.slug,
                report.status.to_db_string(),
                report.pages_visited as i64,
                report.summaries_discovered as i64,
                report.duplicates_skipped as i64,
                report.rejected_entries as i64,
                report.saved as i64,
                report.repaired as i64,
                report.failed as i64
            ],
        )?;
        Ok(())
    }

    fn get_section_reports(&self, run_id: i64) -> StorageResult<Vec<SectionReportRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, section, status, pages_visited, summaries_discovered,
             duplicates_skipped, rejected_entries, saved, repaired, failed
             FROM section_reports WHERE run_id = ?1 ORDER BY id",
        )?;

        let records = stmt
            .query_map(params![run_id], |row| {
                Ok(SectionReportRecord {
                    run_id: row.get(0)?,
                    section: row.get(1)?,
                    status: SectionStatus::from_db_string(&row.get::<_, String>(2)?)
                        .unwrap_or(SectionStatus::ErrorAborted),
                    pages_visited: row.get::<_, i64>(3)? as u64,
                    summaries_discovered: row.get::<_, i64>(4)? as u64,
                    duplicates_skipped: row.get::<_, i64>(5)? as u64,
                    rejected_entries: row.get::<_, i64>(6)? as u64,
                    saved: row.get::<_, i64>(7)? as u64,
                    repaired: row.get::<_, i64>(8)? as u64,
                    failed: row.get::<_, i64>(9)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    // ===== Statistics =====

    fn count_posts(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_posts_by_section(&self) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT section, COUNT(*) FROM posts GROUP BY section ORDER BY section")?;
        let counts = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(counts)
    }

    fn count_raw_dates(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM posts WHERE date IS NOT NULL AND date_canonical = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_undated(&self) -> StorageResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM posts WHERE date IS NULL", [], |row| {
                    row.get(0)
                })?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn sample_post() -> PostDetail {
        PostDetail {
            slug: "launch-day".to_string(),
            title: "Launch Day".to_string(),
            url: "https://example.com/news/launch-day/".to_string(),
            date: Some(PostDate::Canonical("2023-03-05".to_string())),
            section: "news".to_string(),
            categories: vec!["Announcements".to_string()],
            tags: vec!["launch".to_string(), "product".to_string()],
            content: "We launched.".to_string(),
        }
    }

    fn updated_at(storage: &SqliteStorage, url: &str) -> String {
        storage
            .conn
            .query_row(
                "SELECT updated_at FROM posts WHERE url = ?1",
                params![url],
                |row| row.get(0),
            )
            .unwrap()
    }

    #[test]
    fn test_create_and_finish_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("abc123").unwrap();

        let run = storage.get_run(run_id).unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert!(run.finished_at.is_none());

        storage.finish_run(run_id, RunStatus::Interrupted).unwrap();
        let run = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(run.id, run_id);
        assert_eq!(run.status, RunStatus::Interrupted);
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_get_missing_run() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        assert!(matches!(
            storage.get_run(42),
            Err(StorageError::RunNotFound(42))
        ));
    }

    #[test]
    fn test_upsert_roundtrip() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let post = sample_post();

        assert_eq!(storage.upsert_post(&post).unwrap(), UpsertOutcome::Inserted);

        let loaded = storage.get_post_by_url(&post.url).unwrap().unwrap();
        assert_eq!(loaded, post);
    }

    #[test]
    fn test_upsert_same_record_is_unchanged() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let post = sample_post();

        storage.upsert_post(&post).unwrap();
        let before = updated_at(&storage, &post.url);

        assert_eq!(storage.upsert_post(&post).unwrap(), UpsertOutcome::Unchanged);
        assert_eq!(updated_at(&storage, &post.url), before);
        assert_eq!(storage.count_posts().unwrap(), 1);
    }

    #[test]
    fn test_upsert_changed_record_updates() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut post = sample_post();
        storage.upsert_post(&post).unwrap();

        post.content = "We launched, again.".to_string();
        post.date = Some(PostDate::Raw("sometime in spring".to_string()));
        assert_eq!(storage.upsert_post(&post).unwrap(), UpsertOutcome::Updated);

        let loaded = storage.get_post_by_url(&post.url).unwrap().unwrap();
        assert_eq!(loaded.content, "We launched, again.");
        assert_eq!(loaded.date, Some(PostDate::Raw("sometime in spring".to_string())));
        assert_eq!(storage.count_raw_dates().unwrap(), 1);
    }

    #[test]
    fn test_known_urls_by_section() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let news = sample_post();
        let mut blog = sample_post();
        blog.url = "https://example.com/blog/hello/".to_string();
        blog.section = "blog".to_string();
        blog.date = None;

        storage.upsert_post(&news).unwrap();
        storage.upsert_post(&blog).unwrap();

        assert_eq!(storage.known_urls(None).unwrap().len(), 2);
        assert_eq!(
            storage.known_urls(Some("blog")).unwrap(),
            vec!["https://example.com/blog/hello/".to_string()]
        );
        assert_eq!(
            storage.count_posts_by_section().unwrap(),
            vec![("blog".to_string(), 1), ("news".to_string(), 1)]
        );
        assert_eq!(storage.count_undated().unwrap(), 1);
        assert_eq!(storage.list_posts(Some("news")).unwrap(), vec![news]);
    }

    #[test]
    fn test_section_reports() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("hash").unwrap();

        let report = SectionReport {
            slug: "news".to_string(),
            status: SectionStatus::BackendExhausted,
            pages_visited: 2,
            summaries_discovered: 10,
            duplicates_skipped: 3,
            rejected_entries: 1,
            saved: 4,
            repaired: 1,
            failed: 3,
            errors: BTreeMap::new(),
            duration_ms: 1200,
        };
        storage.record_section_report(run_id, &report).unwrap();

        let records = storage.get_section_reports(run_id).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].section, "news");
        assert_eq!(records[0].status, SectionStatus::BackendExhausted);
        assert_eq!(records[0].saved, 4);
        assert_eq!(records[0].failed, 3);
    }

    #[test]
    fn test_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("harvest.db");
        let storage = SqliteStorage::new(&path);
        assert!(storage.is_ok());
        assert!(path.exists());
    }
}
