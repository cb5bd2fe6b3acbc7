//! Harvest coordinator - run-level orchestration
//!
//! Owns everything that outlives a single section:
//! - The run record in storage
//! - The Dedup Set, seeded from the store so reruns are incremental
//! - One freshly provisioned backend session per section
//! - The Run Aggregator, whose per-section reports are persisted
//!
//! Sections are harvested one after another; a failing section never stops
//! the sections after it.

use crate::config::Config;
use crate::crawler::dedup::{DedupSet, SharedDedupSet};
use crate::crawler::section::{CancelFlag, CrawlSettings, SectionContext, SectionCrawler};
use crate::extract::{BackendProvider, HttpBackendProvider};
use crate::model::Section;
use crate::output::{
    write_run_summary, CrawlEvent, CrawlObserver, DocumentSink, FanoutSink, JsonlTelemetry,
    NullTelemetry, RecordSink, RunAggregator, RunReport, StoreSink, TelemetryEvent,
    TelemetrySink,
};
use crate::state::SectionStatus;
use crate::storage::{RunStatus, SharedStorage, SqliteStorage, Storage};
use crate::HarvestError;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Run-level harvest orchestration
pub struct Harvester {
    settings: CrawlSettings,
    sections: Vec<Section>,
    provider: Box<dyn BackendProvider>,
    storage: SharedStorage,
    sink: Box<dyn RecordSink>,
    telemetry: Box<dyn TelemetrySink>,
    cancel: CancelFlag,
    config_hash: String,
    fresh: bool,
}

impl Harvester {
    /// Creates a harvester with no telemetry, no cancellation and an empty
    /// config hash
    pub fn new(
        settings: CrawlSettings,
        sections: Vec<Section>,
        provider: Box<dyn BackendProvider>,
        storage: SharedStorage,
        sink: Box<dyn RecordSink>,
    ) -> Self {
        Self {
            settings,
            sections,
            provider,
            storage,
            sink,
            telemetry: Box::new(NullTelemetry),
            cancel: CancelFlag::new(),
            config_hash: String::new(),
            fresh: false,
        }
    }

    pub fn with_telemetry(mut self, telemetry: Box<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_config_hash(mut self, config_hash: impl Into<String>) -> Self {
        self.config_hash = config_hash.into();
        self
    }

    /// Skips seeding the Dedup Set from the store
    pub fn fresh(mut self, fresh: bool) -> Self {
        self.fresh = fresh;
        self
    }

    fn storage(&self) -> MutexGuard<'_, dyn Storage + 'static> {
        self.storage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs every section and returns the finalized report
    ///
    /// Errors are returned only for run-level storage failures; those leave
    /// the run marked `aborted`.
    pub async fn run(&self) -> Result<RunReport, HarvestError> {
        let run_id = self.storage().create_run(&self.config_hash)?;
        tracing::info!(
            "Starting harvest run {} over {} sections",
            run_id,
            self.sections.len()
        );

        match self.harvest(run_id).await {
            Ok(report) => Ok(report),
            Err(e) => {
                tracing::error!("Harvest run {} aborted: {}", run_id, e);
                if let Err(finish_err) = self.storage().finish_run(run_id, RunStatus::Aborted) {
                    tracing::warn!("Could not mark run {} aborted: {}", run_id, finish_err);
                }
                Err(e)
            }
        }
    }

    async fn harvest(&self, run_id: i64) -> Result<RunReport, HarvestError> {
        let dedup = if self.fresh {
            tracing::info!("Fresh run, ignoring previously harvested posts");
            SharedDedupSet::new()
        } else {
            let known = self.storage().known_urls(None)?;
            tracing::info!("Loaded {} known post URLs", known.len());
            SharedDedupSet::seeded(known)
        };

        let aggregator = RunAggregator::new();
        let mut status = RunStatus::Completed;

        for section in &self.sections {
            if self.cancel.is_cancelled() {
                tracing::warn!("Harvest cancelled before section {}", section);
                status = RunStatus::Interrupted;
                break;
            }

            self.harvest_section(section, &dedup, &aggregator).await;

            if let Some(report) = aggregator.section(&section.slug) {
                self.storage().record_section_report(run_id, &report)?;
            }
        }

        if self.cancel.is_cancelled() {
            status = RunStatus::Interrupted;
        }

        self.storage().finish_run(run_id, status)?;

        let report = aggregator.finish(Some(run_id), Some(&self.config_hash), status);
        tracing::info!(
            "Harvest run {} {}: {} pages, {} saved, {} failed, {} known posts",
            run_id,
            status,
            report.pages_visited(),
            report.saved(),
            report.failed(),
            dedup.len()
        );
        self.telemetry.emit(TelemetryEvent::RunFinished {
            report: report.clone(),
        });

        Ok(report)
    }

    /// Harvests one section on its own backend session
    async fn harvest_section(
        &self,
        section: &Section,
        dedup: &SharedDedupSet,
        aggregator: &RunAggregator,
    ) -> SectionStatus {
        let backend = match self.provider.provision(section).await {
            Ok(backend) => backend,
            Err(e) => {
                tracing::error!("Could not provision a backend for {}: {}", section, e);
                aggregator.observe(&CrawlEvent::SectionStarted { section });
                aggregator.observe(&CrawlEvent::SectionFinished {
                    section,
                    status: SectionStatus::ErrorAborted,
                });
                return SectionStatus::ErrorAborted;
            }
        };

        let ctx = SectionContext {
            section,
            backend: backend.as_ref(),
            dedup,
            sink: self.sink.as_ref(),
            observer: aggregator,
            telemetry: self.telemetry.as_ref(),
            cancel: &self.cancel,
        };
        let status = SectionCrawler::new(ctx, self.settings).run().await;

        if let Err(e) = backend.close().await {
            tracing::warn!("Could not close the backend session for {}: {}", section, e);
        }

        status
    }
}

/// What a harvest invocation covers
#[derive(Debug, Clone, Default)]
pub struct HarvestOptions {
    /// Do not seed the Dedup Set from the store
    pub fresh: bool,

    /// Restrict the run to these section slugs (empty means all)
    pub sections: Vec<String>,
}

/// Runs a complete harvest from a loaded configuration
///
/// This is the main entry point for the binary. It will:
/// 1. Open the store
/// 2. Build the HTTP extraction backend
/// 3. Assemble the record sinks and telemetry
/// 4. Harvest every selected section
/// 5. Write the run summary when `summary-path` is configured
pub async fn run_harvest(
    config: &Config,
    config_hash: &str,
    options: &HarvestOptions,
    cancel: CancelFlag,
) -> Result<RunReport, HarvestError> {
    let sections = config.resolve_sections(&options.sections)?;

    let storage: SharedStorage = Arc::new(Mutex::new(SqliteStorage::new(Path::new(
        &config.output.database_path,
    ))?));

    let provider = HttpBackendProvider::new(&config.backend)?;

    let mut sink = FanoutSink::new().with(StoreSink::new(Arc::clone(&storage)));
    if let Some(dir) = &config.output.documents_dir {
        sink = sink.with(DocumentSink::new(dir));
    }

    let telemetry: Box<dyn TelemetrySink> = match &config.output.telemetry_path {
        Some(path) => Box::new(JsonlTelemetry::open(Path::new(path))?),
        None => Box::new(NullTelemetry),
    };

    let harvester = Harvester::new(
        CrawlSettings::from(&config.harvester),
        sections,
        Box::new(provider),
        storage,
        Box::new(sink),
    )
    .with_telemetry(telemetry)
    .with_cancel(cancel)
    .with_config_hash(config_hash)
    .fresh(options.fresh);

    let report = harvester.run().await?;

    if let Some(path) = &config.output.summary_path {
        write_run_summary(&report, Path::new(path))?;
        tracing::info!("Run summary written to {}", path);
    }

    Ok(report)
}
