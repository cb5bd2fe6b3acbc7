//! Extraction Adapter
//!
//! Wraps one backend session for one section. Every call is timed, its
//! failure classified, its payload normalized, and exactly one metric event
//! is emitted for it before the result is handed back.

use crate::extract::instructions::{
    detail_instruction, detail_schema, diagnostic_instruction, listing_instruction,
    listing_schema,
};
use crate::extract::{ExtractionBackend, ExtractionFailure, ExtractionRequest, FailureClass};
use crate::model::{PageTarget, PostDetail, Section};
use crate::normalize::{normalize_detail, normalize_listing, DetailContext, ListingPage, Normalized};
use crate::output::{DiagnosticCapture, ExtractionMetric, TelemetryEvent, TelemetrySink};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::{Duration, Instant};

/// Longest diagnostic preview kept in logs and telemetry
const DIAGNOSTIC_PREVIEW_CHARS: usize = 2000;

/// What an extraction call was for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionKind {
    Listing,
    Detail,
    Diagnostic,
}

impl fmt::Display for ExtractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Listing => "listing",
            Self::Detail => "detail",
            Self::Diagnostic => "diagnostic",
        };
        write!(f, "{}", name)
    }
}

/// Outcome recorded in the metric event of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionOutcome {
    OkValid,
    OkInvalidShape,
    SessionError,
    BackendError,
}

/// Result of one extraction
///
/// Callers must handle all three cases; a failure is a value, not a panic or
/// an `Err` that can be bubbled past the item.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction<T> {
    Valid(T),
    Repaired(T),
    Failed(ExtractionFailure),
}

impl<T> Extraction<T> {
    /// Value of a successful extraction
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Valid(v) | Self::Repaired(v) => Some(v),
            Self::Failed(_) => None,
        }
    }
}

impl<T> From<Normalized<T>> for Extraction<T> {
    fn from(normalized: Normalized<T>) -> Self {
        match normalized {
            Normalized::Valid(v) => Self::Valid(v),
            Normalized::Repaired(v) => Self::Repaired(v),
        }
    }
}

/// One section's view of its backend session
pub struct ExtractionAdapter<'a> {
    backend: &'a dyn ExtractionBackend,
    telemetry: &'a dyn TelemetrySink,
    section: &'a Section,
}

impl<'a> ExtractionAdapter<'a> {
    pub fn new(
        backend: &'a dyn ExtractionBackend,
        telemetry: &'a dyn TelemetrySink,
        section: &'a Section,
    ) -> Self {
        Self {
            backend,
            telemetry,
            section,
        }
    }

    /// Runs one extraction and normalizes its payload
    pub async fn extract<T, F>(
        &self,
        kind: ExtractionKind,
        target: &str,
        instruction: &str,
        schema: Option<&Value>,
        normalize: F,
    ) -> Extraction<T>
    where
        T: Send,
        F: FnOnce(&Value) -> Normalized<T> + Send,
    {
        let started = Instant::now();
        let result = self
            .backend
            .extract(ExtractionRequest {
                target,
                instruction,
                schema,
            })
            .await;
        let elapsed = started.elapsed();

        let (extraction, outcome, error) = match result {
            Ok(payload) => {
                let normalized = normalize(&payload);
                let outcome = if normalized.is_repaired() {
                    ExtractionOutcome::OkInvalidShape
                } else {
                    ExtractionOutcome::OkValid
                };
                (Extraction::from(normalized), outcome, None)
            }
            Err(e) => {
                let failure = ExtractionFailure::from(&e);
                let outcome = match failure.class {
                    FailureClass::Session => ExtractionOutcome::SessionError,
                    FailureClass::Permanent => ExtractionOutcome::BackendError,
                };
                tracing::debug!("{} extraction of {} failed: {}", kind, target, e);
                (Extraction::Failed(failure), outcome, Some(e.to_string()))
            }
        };

        self.record_metric(kind, target, elapsed, outcome, error);
        extraction
    }

    /// Extracts the summaries and next-page hint of a listing page
    ///
    /// A listing that yields zero summaries triggers one best-effort
    /// diagnostic capture of the page; its result never reaches the caller.
    pub async fn extract_listing(&self, target: &PageTarget) -> Extraction<ListingPage> {
        let instruction = listing_instruction(self.section, target);
        let schema = listing_schema();
        let page_url = &target.url;

        let extraction = self
            .extract(
                ExtractionKind::Listing,
                target.url.as_str(),
                &instruction,
                Some(&schema),
                |payload| normalize_listing(payload, page_url),
            )
            .await;

        if let Some(page) = extraction.value() {
            if page.summaries.is_empty() {
                self.capture_diagnostic(target).await;
            }
        }

        extraction
    }

    /// Extracts the record of one detail page
    pub async fn extract_detail(&self, url: &str) -> Extraction<PostDetail> {
        let instruction = detail_instruction(self.section);
        let schema = detail_schema();
        let section = self.section;

        self.extract(
            ExtractionKind::Detail,
            url,
            &instruction,
            Some(&schema),
            |payload| {
                normalize_detail(
                    payload,
                    DetailContext {
                        requested_url: url,
                        section,
                    },
                )
            },
        )
        .await
    }

    async fn capture_diagnostic(&self, target: &PageTarget) {
        let instruction = diagnostic_instruction(target);
        let capture = self
            .extract(
                ExtractionKind::Diagnostic,
                target.url.as_str(),
                &instruction,
                None,
                |payload| Normalized::Valid(payload.clone()),
            )
            .await;

        let (preview, error) = match capture {
            Extraction::Valid(payload) | Extraction::Repaired(payload) => {
                let preview = truncate_chars(&payload.to_string(), DIAGNOSTIC_PREVIEW_CHARS);
                tracing::info!(
                    "{} of {} yielded no posts; page shows: {}",
                    target,
                    self.section,
                    preview
                );
                (Some(preview), None)
            }
            Extraction::Failed(failure) => {
                tracing::debug!("Diagnostic capture of {} failed: {}", target, failure.message);
                (None, Some(failure.message))
            }
        };

        self.telemetry
            .emit(TelemetryEvent::Diagnostic(DiagnosticCapture {
                timestamp: chrono::Utc::now().to_rfc3339(),
                section: self.section.slug.clone(),
                target: target.url.to_string(),
                preview,
                error,
            }));
    }

    fn record_metric(
        &self,
        kind: ExtractionKind,
        target: &str,
        elapsed: Duration,
        outcome: ExtractionOutcome,
        error: Option<String>,
    ) {
        self.telemetry
            .emit(TelemetryEvent::Extraction(ExtractionMetric {
                timestamp: chrono::Utc::now().to_rfc3339(),
                section: self.section.slug.clone(),
                target: target.to_string(),
                kind,
                duration_ms: elapsed.as_millis() as u64,
                outcome,
                error,
            }));
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
