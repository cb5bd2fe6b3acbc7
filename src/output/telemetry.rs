//! Run telemetry
//!
//! Write-and-forget structured events. A sink never reports failure to its
//! caller: nothing in the harvester may behave differently because telemetry
//! could not be written.

use crate::extract::{ExtractionKind, ExtractionOutcome};
use crate::output::{OutputResult, RunReport};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// One extraction call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionMetric {
    pub timestamp: String,
    pub section: String,
    pub target: String,
    pub kind: ExtractionKind,
    pub duration_ms: u64,
    pub outcome: ExtractionOutcome,
    pub error: Option<String>,
}

/// What the backend perceived on a listing page that produced no summaries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticCapture {
    pub timestamp: String,
    pub section: String,
    pub target: String,
    pub preview: Option<String>,
    pub error: Option<String>,
}

/// Structured telemetry event, serialized with an `event` tag
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TelemetryEvent {
    Extraction(ExtractionMetric),
    Diagnostic(DiagnosticCapture),
    RunFinished { report: RunReport },
}

/// Best-effort event sink
pub trait TelemetrySink: Send + Sync {
    fn emit(&self, event: TelemetryEvent);
}

impl<T: TelemetrySink + ?Sized> TelemetrySink for Arc<T> {
    fn emit(&self, event: TelemetryEvent) {
        (**self).emit(event)
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTelemetry;

impl TelemetrySink for NullTelemetry {
    fn emit(&self, _event: TelemetryEvent) {}
}

/// Appends one JSON document per line to a file
#[derive(Debug)]
pub struct JsonlTelemetry {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlTelemetry {
    /// Opens `path` for appending, creating it and its parent directories
    pub fn open(path: &Path) -> OutputResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TelemetrySink for JsonlTelemetry {
    fn emit(&self, event: TelemetryEvent) {
        let line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(e) => {
                tracing::debug!("Dropping telemetry event: {}", e);
                return;
            }
        };

        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(file, "{}", line) {
            tracing::debug!("Failed to write telemetry to {}: {}", self.path.display(), e);
        }
    }
}

/// Keeps events in memory, for inspection after a run
#[derive(Debug, Default)]
pub struct MemoryTelemetry {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl MemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TelemetrySink for MemoryTelemetry {
    fn emit(&self, event: TelemetryEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
