//! Statistics generation from the harvest database
//!
//! This module provides functionality for extracting and displaying
//! harvest statistics from the storage layer.

use crate::storage::{RunRecord, SectionReportRecord, Storage};
use crate::HarvestError;

/// Harvest statistics summary
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// Total number of stored posts
    pub total_posts: u64,

    /// Stored posts per section, sorted by section
    pub posts_by_section: Vec<(String, u64)>,

    /// Posts whose date was kept as raw text
    pub raw_dates: u64,

    /// Posts without any date
    pub undated: u64,

    /// Most recent run, if any
    pub latest_run: Option<RunRecord>,

    /// Section reports of the most recent run
    pub latest_sections: Vec<SectionReportRecord>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(HarvestStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<HarvestStatistics, HarvestError> {
    let latest_run = storage.get_latest_run()?;
    let latest_sections = match &latest_run {
        Some(run) => storage.get_section_reports(run.id)?,
        None => Vec::new(),
    };

    Ok(HarvestStatistics {
        total_posts: storage.count_posts()?,
        posts_by_section: storage.count_posts_by_section()?,
        raw_dates: storage.count_raw_dates()?,
        undated: storage.count_undated()?,
        latest_run,
        latest_sections,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Total posts: {}", stats.total_posts);
    println!("  Sections with posts: {}", stats.posts_by_section.len());
    println!("  Unnormalized dates: {}", stats.raw_dates);
    println!("  Undated posts: {}", stats.undated);
    println!();

    if !stats.posts_by_section.is_empty() {
        println!("Posts by Section:");
        for (section, count) in &stats.posts_by_section {
            let percentage = if stats.total_posts > 0 {
                (*count as f64 / stats.total_posts as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", section, count, percentage);
        }
        println!();
    }

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run ({}):", run.id);
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            println!("  Status: {}", run.status);

            for section in &stats.latest_sections {
                println!(
                    "  - {}: {} ({} pages, {} saved, {} failed, {} duplicates)",
                    section.section,
                    section.status,
                    section.pages_visited,
                    section.saved,
                    section.failed,
                    section.duplicates_skipped
                );
            }
        }
        None => println!("No harvest runs recorded yet."),
    }
}
