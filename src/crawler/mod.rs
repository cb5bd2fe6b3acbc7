//! Crawler module for section harvesting
//!
//! This module contains the core harvesting logic, including:
//! - Pagination over a section's listing pages
//! - Deduplication of detail URLs across sections and runs
//! - The retry decision for failed extractions
//! - The per-section crawl loop and its session circuit breaker
//! - Overall run coordination

mod coordinator;
mod cursor;
mod dedup;
mod retry;
mod section;

pub use coordinator::{run_harvest, HarvestOptions, Harvester};
pub use cursor::{CursorStep, PaginationCursor};
pub use dedup::{DedupSet, SharedDedupSet};
pub use retry::{next_action, AttemptState, NextAction, RetryPolicy};
pub use section::{CancelFlag, CrawlSettings, SectionContext, SectionCrawler};
