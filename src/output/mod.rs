//! Output module for records, reports and telemetry
//!
//! This module handles:
//! - Delivering normalized records to the store and to markdown documents
//! - Aggregating run counters into section and run reports
//! - Best-effort structured telemetry
//! - Statistics and summaries generated from the database

mod markdown;
mod report;
mod sink;
pub mod stats;
mod telemetry;

pub use markdown::{
    document_path, format_run_summary, render_post_document, write_run_summary,
};
pub use report::{CrawlEvent, CrawlObserver, ErrorKind, RunAggregator, RunReport, SectionReport};
pub use sink::{DocumentSink, FanoutSink, RecordSink, SinkError, StoreSink};
pub use stats::{load_statistics, print_statistics, HarvestStatistics};
pub use telemetry::{
    DiagnosticCapture, ExtractionMetric, JsonlTelemetry, MemoryTelemetry, NullTelemetry,
    TelemetryEvent, TelemetrySink,
};

use crate::storage::Storage;
use crate::HarvestError;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Rebuilds the report of the latest run from storage
///
/// # Arguments
///
/// * `storage` - The storage backend containing harvest data
///
/// # Returns
///
/// * `Ok(RunReport)` - Successfully generated report
/// * `Err(HarvestError)` - No run recorded, or the query failed
pub fn generate_summary(storage: &dyn Storage) -> Result<RunReport, HarvestError> {
    let run = storage
        .get_latest_run()?
        .ok_or_else(|| HarvestError::Storage("No harvest runs found in database".to_string()))?;

    let sections = storage.get_section_reports(run.id)?;
    Ok(RunReport::from_records(&run, &sections))
}
