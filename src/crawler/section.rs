//! Section Crawler
//!
//! Drives one section through `pending -> running -> {complete,
//! backend_exhausted, error_aborted}`:
//!
//! 1. Resolve the page target through the [`PaginationCursor`]
//! 2. Extract the listing page (retried per [`RetryPolicy`])
//! 3. For each summary not yet in the Dedup Set, extract the detail page
//!    (retried per [`RetryPolicy`]) and forward the record to the sink
//! 4. Advance the cursor
//!
//! The section stops when the cursor is done, the page budget is used up,
//! the session health monitor trips, or the run is cancelled.

use crate::config::HarvesterConfig;
use crate::crawler::cursor::{CursorStep, PaginationCursor};
use crate::crawler::dedup::DedupSet;
use crate::crawler::retry::{next_action, AttemptState, NextAction, RetryPolicy};
use crate::extract::{Extraction, ExtractionAdapter, ExtractionBackend, FailureClass};
use crate::model::{PageTarget, PostDetail, Section};
use crate::normalize::ListingPage;
use crate::output::{CrawlEvent, CrawlObserver, ErrorKind, RecordSink, TelemetrySink};
use crate::state::{HealthSignal, SectionStatus, SessionHealth};
use crate::HarvestError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Cooperative cancellation shared by the whole run
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Limits applied to every section of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSettings {
    /// Page budget per section
    pub max_pages: u32,

    pub retry: RetryPolicy,

    /// Consecutive escalated session failures before the session is abandoned
    pub session_failure_threshold: u32,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self::from(&HarvesterConfig::default())
    }
}

impl From<&HarvesterConfig> for CrawlSettings {
    fn from(config: &HarvesterConfig) -> Self {
        Self {
            max_pages: config.max_pages_per_section.max(1),
            retry: RetryPolicy::from(config),
            session_failure_threshold: config.session_failure_threshold,
        }
    }
}

/// Collaborators of one section's crawl
#[derive(Clone, Copy)]
pub struct SectionContext<'a> {
    pub section: &'a Section,
    pub backend: &'a dyn ExtractionBackend,
    pub dedup: &'a dyn DedupSet,
    pub sink: &'a dyn RecordSink,
    pub observer: &'a dyn CrawlObserver,
    pub telemetry: &'a dyn TelemetrySink,
    pub cancel: &'a CancelFlag,
}

/// How a single detail URL ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetailOutcome {
    Saved,
    Failed,
    /// The health monitor tripped on this item
    Exhausted,
    /// Cancelled between attempts
    Interrupted,
}

/// One section's crawl loop
pub struct SectionCrawler<'a> {
    section: &'a Section,
    adapter: ExtractionAdapter<'a>,
    dedup: &'a dyn DedupSet,
    sink: &'a dyn RecordSink,
    observer: &'a dyn CrawlObserver,
    cancel: &'a CancelFlag,
    settings: CrawlSettings,
    health: SessionHealth,
    status: SectionStatus,
}

impl<'a> SectionCrawler<'a> {
    /// Creates a crawler with a fresh (healthy) session monitor
    pub fn new(ctx: SectionContext<'a>, settings: CrawlSettings) -> Self {
        Self {
            section: ctx.section,
            adapter: ExtractionAdapter::new(ctx.backend, ctx.telemetry, ctx.section),
            dedup: ctx.dedup,
            sink: ctx.sink,
            observer: ctx.observer,
            cancel: ctx.cancel,
            health: SessionHealth::new(settings.session_failure_threshold),
            settings,
            status: SectionStatus::Pending,
        }
    }

    pub fn status(&self) -> SectionStatus {
        self.status
    }

    /// Runs the section to a terminal status
    pub async fn run(mut self) -> SectionStatus {
        self.observer.observe(&CrawlEvent::SectionStarted {
            section: self.section,
        });
        tracing::info!("Harvesting section {} from {}", self.section, self.section.base_url);

        let finished = match self.transition(SectionStatus::Running) {
            Ok(()) => self.crawl().await,
            Err(e) => {
                tracing::error!("Section {} could not start: {}", self.section, e);
                SectionStatus::ErrorAborted
            }
        };

        if let Err(e) = self.transition(finished) {
            tracing::error!("Section {} ended inconsistently: {}", self.section, e);
            self.status = SectionStatus::ErrorAborted;
        }

        self.observer.observe(&CrawlEvent::SectionFinished {
            section: self.section,
            status: self.status,
        });
        tracing::info!("Section {} finished: {}", self.section, self.status);

        self.status
    }

    fn transition(&mut self, next: SectionStatus) -> Result<(), HarvestError> {
        if !self.status.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// The page loop; returns the terminal status
    async fn crawl(&mut self) -> SectionStatus {
        let mut cursor = PaginationCursor::new(self.section.base_url.clone());
        let mut target = cursor.first();

        loop {
            if self.cancel.is_cancelled() {
                tracing::warn!("Section {} cancelled before {}", self.section, target);
                return SectionStatus::BackendExhausted;
            }

            let page = match self.fetch_listing(&target).await {
                Ok(page) => page,
                Err(status) => return status,
            };

            self.observer.observe(&CrawlEvent::PageVisited {
                section: self.section,
                target: &target,
                summaries: page.summaries.len(),
                rejected: page.rejected.len(),
            });
            tracing::info!(
                "{} of {}: {} summaries, {} rejected",
                target,
                self.section,
                page.summaries.len(),
                page.rejected.len()
            );

            for (idx, summary) in page.summaries.iter().enumerate() {
                if self.cancel.is_cancelled() {
                    tracing::warn!(
                        "Section {} cancelled, {} queued detail pages skipped",
                        self.section,
                        page.summaries.len() - idx
                    );
                    return SectionStatus::BackendExhausted;
                }

                if !self.dedup.claim(&summary.url) {
                    tracing::debug!("Skipping already harvested {}", summary.url);
                    self.observer.observe(&CrawlEvent::DuplicateSkipped {
                        section: self.section,
                        url: &summary.url,
                    });
                    continue;
                }

                match self.harvest_detail(&summary.url).await {
                    DetailOutcome::Saved | DetailOutcome::Failed => {}
                    DetailOutcome::Exhausted => {
                        tracing::warn!(
                            "Backend session for {} exhausted, skipping {} remaining detail pages and all later pages",
                            self.section,
                            page.summaries.len() - idx - 1
                        );
                        return SectionStatus::BackendExhausted;
                    }
                    DetailOutcome::Interrupted => {
                        tracing::warn!("Section {} cancelled during {}", self.section, summary.url);
                        return SectionStatus::BackendExhausted;
                    }
                }
            }

            if target.number >= self.settings.max_pages {
                tracing::info!(
                    "Section {} reached its page budget of {}",
                    self.section,
                    self.settings.max_pages
                );
                return SectionStatus::Complete;
            }

            match cursor.next(page.next_hint.as_deref(), !page.summaries.is_empty()) {
                CursorStep::Next(next) => target = next,
                CursorStep::Done => {
                    tracing::info!("Section {} has no pages after {}", self.section, target);
                    return SectionStatus::Complete;
                }
            }
        }
    }

    /// Extracts one listing page, retrying session failures
    ///
    /// A listing that cannot be extracted ends the section with the returned
    /// status.
    async fn fetch_listing(&mut self, target: &PageTarget) -> Result<ListingPage, SectionStatus> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let failure = match self.adapter.extract_listing(target).await {
                Extraction::Valid(page) => {
                    self.health.record(HealthSignal::Success);
                    return Ok(page);
                }
                Extraction::Repaired(page) => {
                    tracing::info!("Listing {} of {} was repaired", target, self.section);
                    self.health.record(HealthSignal::Success);
                    return Ok(page);
                }
                Extraction::Failed(failure) => failure,
            };

            let state = AttemptState {
                attempt,
                last_failure: failure.class,
            };

            match next_action(&self.settings.retry, &state) {
                NextAction::Retry(delay) => {
                    tracing::warn!(
                        "Session error on {} of {} (attempt {}/{}): {}",
                        target,
                        self.section,
                        attempt,
                        self.settings.retry.max_attempts,
                        failure.message
                    );
                    if !self.backoff(delay).await {
                        return Err(SectionStatus::BackendExhausted);
                    }
                }
                NextAction::GiveUp => {
                    tracing::error!(
                        "Listing {} of {} failed: {}",
                        target,
                        self.section,
                        failure.message
                    );
                    self.health.record(HealthSignal::OtherFailure);
                    self.observe_listing_failure(target, failure.class);
                    return Err(SectionStatus::ErrorAborted);
                }
                NextAction::Escalate => {
                    self.health.record(HealthSignal::SessionFailure);
                    tracing::error!(
                        "Listing {} of {} still failing with session errors after {} attempts ({}/{} toward the session limit), ending section without a listing to continue from: {}",
                        target,
                        self.section,
                        attempt,
                        self.health.consecutive_failures(),
                        self.health.threshold(),
                        failure.message
                    );
                    self.observe_listing_failure(target, failure.class);
                    return Err(SectionStatus::BackendExhausted);
                }
            }
        }
    }

    /// Extracts one detail page and forwards the record
    async fn harvest_detail(&mut self, url: &str) -> DetailOutcome {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let failure = match self.adapter.extract_detail(url).await {
                Extraction::Valid(post) => {
                    self.health.record(HealthSignal::Success);
                    return self.deliver(&post, false);
                }
                Extraction::Repaired(post) => {
                    tracing::info!("Detail {} was repaired from a loose payload", url);
                    self.health.record(HealthSignal::Success);
                    return self.deliver(&post, true);
                }
                Extraction::Failed(failure) => failure,
            };

            let state = AttemptState {
                attempt,
                last_failure: failure.class,
            };

            match next_action(&self.settings.retry, &state) {
                NextAction::Retry(delay) => {
                    tracing::warn!(
                        "Session error on {} (attempt {}/{}), retrying in {:?}: {}",
                        url,
                        attempt,
                        self.settings.retry.max_attempts,
                        delay,
                        failure.message
                    );
                    if !self.backoff(delay).await {
                        return DetailOutcome::Interrupted;
                    }
                }
                NextAction::GiveUp => {
                    tracing::warn!("Extraction of {} failed: {}", url, failure.message);
                    self.health.record(HealthSignal::OtherFailure);
                    self.observe_detail_failure(url, ErrorKind::from(failure.class));
                    return DetailOutcome::Failed;
                }
                NextAction::Escalate => {
                    tracing::warn!(
                        "Extraction of {} failed after {} attempts: {}",
                        url,
                        attempt,
                        failure.message
                    );
                    self.health.record(HealthSignal::SessionFailure);
                    self.observe_detail_failure(url, ErrorKind::from(FailureClass::Session));
                    return if self.health.is_healthy() {
                        DetailOutcome::Failed
                    } else {
                        DetailOutcome::Exhausted
                    };
                }
            }
        }
    }

    fn deliver(&self, post: &PostDetail, repaired: bool) -> DetailOutcome {
        match self.sink.accept(post) {
            Ok(()) => {
                self.observer.observe(&CrawlEvent::RecordSaved {
                    section: self.section,
                    url: &post.url,
                    repaired,
                });
                DetailOutcome::Saved
            }
            Err(e) => {
                tracing::warn!("Could not save {}: {}", post.url, e);
                self.observe_detail_failure(&post.url, ErrorKind::SinkError);
                DetailOutcome::Failed
            }
        }
    }

    /// Sleeps before a retry; returns false if the run was cancelled
    async fn backoff(&self, delay: Duration) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        !self.cancel.is_cancelled()
    }

    fn observe_listing_failure(&self, target: &PageTarget, class: FailureClass) {
        self.observer.observe(&CrawlEvent::ListingFailed {
            section: self.section,
            target,
            kind: ErrorKind::from(class),
        });
    }

    fn observe_detail_failure(&self, url: &str, kind: ErrorKind) {
        self.observer.observe(&CrawlEvent::DetailFailed {
            section: self.section,
            url,
            kind,
        });
    }
}
