//! Run Aggregator
//!
//! Counts what happened during a run. The crawler only ever writes to it
//! through [`CrawlObserver`]; nothing here is read back to make a decision.

use crate::extract::FailureClass;
use crate::model::{PageTarget, Section};
use crate::state::SectionStatus;
use crate::storage::{RunRecord, RunStatus, SectionReportRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

/// Kind of failure counted in the error histogram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Backend session unavailable
    SessionError,

    /// Any other extraction failure
    ExtractionError,

    /// A sink refused a record
    SinkError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionError => "session_error",
            Self::ExtractionError => "extraction_error",
            Self::SinkError => "sink_error",
        }
    }
}

impl From<FailureClass> for ErrorKind {
    fn from(class: FailureClass) -> Self {
        match class {
            FailureClass::Session => Self::SessionError,
            FailureClass::Permanent => Self::ExtractionError,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Something the crawler did
#[derive(Debug, Clone, Copy)]
pub enum CrawlEvent<'a> {
    SectionStarted {
        section: &'a Section,
    },
    PageVisited {
        section: &'a Section,
        target: &'a PageTarget,
        summaries: usize,
        rejected: usize,
    },
    ListingFailed {
        section: &'a Section,
        target: &'a PageTarget,
        kind: ErrorKind,
    },
    DuplicateSkipped {
        section: &'a Section,
        url: &'a str,
    },
    RecordSaved {
        section: &'a Section,
        url: &'a str,
        repaired: bool,
    },
    DetailFailed {
        section: &'a Section,
        url: &'a str,
        kind: ErrorKind,
    },
    SectionFinished {
        section: &'a Section,
        status: SectionStatus,
    },
}

/// Write-only view of the run's bookkeeping
pub trait CrawlObserver: Send + Sync {
    fn observe(&self, event: &CrawlEvent<'_>);
}

/// Counters for one section
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionReport {
    pub slug: String,
    pub status: SectionStatus,
    pub pages_visited: u64,
    pub summaries_discovered: u64,
    pub duplicates_skipped: u64,
    pub rejected_entries: u64,
    pub saved: u64,
    pub repaired: u64,
    pub failed: u64,
    pub errors: BTreeMap<ErrorKind, u64>,
    pub duration_ms: u64,
}

impl SectionReport {
    pub fn new(slug: &str) -> Self {
        Self {
            slug: slug.to_string(),
            status: SectionStatus::Pending,
            pages_visited: 0,
            summaries_discovered: 0,
            duplicates_skipped: 0,
            rejected_entries: 0,
            saved: 0,
            repaired: 0,
            failed: 0,
            errors: BTreeMap::new(),
            duration_ms: 0,
        }
    }

    pub fn error_count(&self, kind: ErrorKind) -> u64 {
        self.errors.get(&kind).copied().unwrap_or(0)
    }

    fn count_error(&mut self, kind: ErrorKind) {
        *self.errors.entry(kind).or_insert(0) += 1;
    }
}

impl From<&SectionReportRecord> for SectionReport {
    fn from(record: &SectionReportRecord) -> Self {
        Self {
            slug: record.section.clone(),
            status: record.status,
            pages_visited: record.pages_visited,
            summaries_discovered: record.summaries_discovered,
            duplicates_skipped: record.duplicates_skipped,
            rejected_entries: record.rejected_entries,
            saved: record.saved,
            repaired: record.repaired,
            failed: record.failed,
            errors: BTreeMap::new(),
            duration_ms: 0,
        }
    }
}

/// Finalized report of a whole run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: Option<i64>,
    pub status: RunStatus,
    pub config_hash: Option<String>,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub duration_ms: Option<u64>,
    pub sections: Vec<SectionReport>,
}

impl RunReport {
    /// Rebuilds a report from stored run data
    ///
    /// Stored reports keep counters only; the error histogram and section
    /// durations are not persisted.
    pub fn from_records(run: &RunRecord, sections: &[SectionReportRecord]) -> Self {
        let duration_ms = run.finished_at.as_deref().and_then(|finished| {
            let started = run.started_at.parse::<DateTime<Utc>>().ok()?;
            let finished = finished.parse::<DateTime<Utc>>().ok()?;
            u64::try_from((finished - started).num_milliseconds()).ok()
        });

        Self {
            run_id: Some(run.id),
            status: run.status,
            config_hash: Some(run.config_hash.clone()),
            started_at: run.started_at.clone(),
            finished_at: run.finished_at.clone(),
            duration_ms,
            sections: sections.iter().map(SectionReport::from).collect(),
        }
    }

    pub fn section(&self, slug: &str) -> Option<&SectionReport> {
        self.sections.iter().find(|s| s.slug == slug)
    }

    pub fn pages_visited(&self) -> u64 {
        self.sections.iter().map(|s| s.pages_visited).sum()
    }

    pub fn saved(&self) -> u64 {
        self.sections.iter().map(|s| s.saved).sum()
    }

    pub fn failed(&self) -> u64 {
        self.sections.iter().map(|s| s.failed).sum()
    }

    /// Error histogram merged over all sections
    pub fn errors(&self) -> BTreeMap<ErrorKind, u64> {
        let mut merged = BTreeMap::new();
        for section in &self.sections {
            for (kind, count) in &section.errors {
                *merged.entry(*kind).or_insert(0) += count;
            }
        }
        merged
    }
}

#[derive(Debug)]
struct AggregatorState {
    sections: Vec<SectionReport>,
    section_started: HashMap<String, Instant>,
}

impl AggregatorState {
    fn section_mut(&mut self, slug: &str) -> &mut SectionReport {
        let idx = match self.sections.iter().position(|s| s.slug == slug) {
            Some(idx) => idx,
            None => {
                self.sections.push(SectionReport::new(slug));
                self.sections.len() - 1
            }
        };
        &mut self.sections[idx]
    }
}

/// Collects [`CrawlEvent`]s into a [`RunReport`]
#[derive(Debug)]
pub struct RunAggregator {
    started: Instant,
    started_at: DateTime<Utc>,
    state: Mutex<AggregatorState>,
}

impl Default for RunAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl RunAggregator {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            started_at: Utc::now(),
            state: Mutex::new(AggregatorState {
                sections: Vec::new(),
                section_started: HashMap::new(),
            }),
        }
    }

    /// Current counters of one section
    pub fn section(&self, slug: &str) -> Option<SectionReport> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.sections.iter().find(|s| s.slug == slug).cloned()
    }

    /// Produces the final report
    pub fn finish(&self, run_id: Option<i64>, config_hash: Option<&str>, status: RunStatus)
        -> RunReport {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        RunReport {
            run_id,
            status,
            config_hash: config_hash.map(str::to_string),
            started_at: self.started_at.to_rfc3339(),
            finished_at: Some(Utc::now().to_rfc3339()),
            duration_ms: Some(self.started.elapsed().as_millis() as u64),
            sections: state.sections.clone(),
        }
    }
}

impl CrawlObserver for RunAggregator {
    fn observe(&self, event: &CrawlEvent<'_>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        match *event {
            CrawlEvent::SectionStarted { section } => {
                state
                    .section_started
                    .insert(section.slug.clone(), Instant::now());
                state.section_mut(&section.slug).status = SectionStatus::Running;
            }
            CrawlEvent::PageVisited {
                section,
                summaries,
                rejected,
                ..
            } => {
                let report = state.section_mut(&section.slug);
                report.pages_visited += 1;
                report.summaries_discovered += summaries as u64;
                report.rejected_entries += rejected as u64;
            }
            CrawlEvent::ListingFailed { section, kind, .. } => {
                state.section_mut(&section.slug).count_error(kind);
            }
            CrawlEvent::DuplicateSkipped { section, .. } => {
                state.section_mut(&section.slug).duplicates_skipped += 1;
            }
            CrawlEvent::RecordSaved {
                section, repaired, ..
            } => {
                let report = state.section_mut(&section.slug);
                report.saved += 1;
                if repaired {
                    report.repaired += 1;
                }
            }
            CrawlEvent::DetailFailed { section, kind, .. } => {
                let report = state.section_mut(&section.slug);
                report.failed += 1;
                report.count_error(kind);
            }
            CrawlEvent::SectionFinished { section, status } => {
                let elapsed = state
                    .section_started
                    .remove(&section.slug)
                    .map(|started| started.elapsed().as_millis() as u64);
                let report = state.section_mut(&section.slug);
                report.status = status;
                if let Some(ms) = elapsed {
                    report.duration_ms = ms;
                }
            }
        }
    }
}
