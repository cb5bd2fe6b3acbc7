//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::model::PostDetail;
use crate::output::SectionReport;
use crate::storage::{RunRecord, RunStatus, SectionReportRecord, UpsertOutcome};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Posts are keyed by canonical URL. Writing the same record twice must leave
/// the store exactly as the first write left it.
pub trait Storage: Send {
    // ===== Run Management =====

    /// Creates a new harvest run and returns its ID
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Sets the final status and finish timestamp of a run
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== Posts =====

    /// Inserts or updates a post
    ///
    /// Returns `Unchanged` (and touches nothing) when the stored record has
    /// the same content hash.
    fn upsert_post(&mut self, post: &PostDetail) -> StorageResult<UpsertOutcome>;

    /// Gets a post by canonical URL
    fn get_post_by_url(&self, url: &str) -> StorageResult<Option<PostDetail>>;

    /// Lists stored posts, optionally restricted to one section
    fn list_posts(&self, section: Option<&str>) -> StorageResult<Vec<PostDetail>>;

    /// URLs already harvested, used to seed the Dedup Set
    fn known_urls(&self, section: Option<&str>) -> StorageResult<Vec<String>>;

    // ===== Section Reports =====

    /// Records the outcome of one section in a run
    fn record_section_report(&mut self, run_id: i64, report: &SectionReport)
        -> StorageResult<()>;

    /// Gets the section reports of a run, in the order they were recorded
    fn get_section_reports(&self, run_id: i64) -> StorageResult<Vec<SectionReportRecord>>;

    // ===== Statistics =====

    /// Gets total post count
    fn count_posts(&self) -> StorageResult<u64>;

    /// Gets post counts per section, sorted by section
    fn count_posts_by_section(&self) -> StorageResult<Vec<(String, u64)>>;

    /// Counts posts whose date could not be normalized
    fn count_raw_dates(&self) -> StorageResult<u64>;

    /// Counts posts without any date
    fn count_undated(&self) -> StorageResult<u64>;
}
