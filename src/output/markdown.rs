//! Markdown generation
//!
//! Two documents are produced here: one file per harvested post (front-matter
//! block followed by the body), and a human-readable summary of a run.

use crate::model::PostDetail;
use crate::output::{OutputResult, RunReport};
use crate::url::sanitize_slug;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Directory used for posts whose section slug sanitizes to nothing
const FALLBACK_SECTION_DIR: &str = "unsorted";

/// Location of a post's document below `root`: `<section>/<slug>.md`
pub fn document_path(root: &Path, post: &PostDetail) -> PathBuf {
    let section = sanitize_slug(&post.section);
    let section = if section.is_empty() {
        FALLBACK_SECTION_DIR.to_string()
    } else {
        section
    };
    root.join(section).join(format!("{}.md", post.slug))
}

/// Renders one post as a markdown document with a front-matter block
pub fn render_post_document(post: &PostDetail) -> String {
    let mut md = String::new();

    md.push_str("---\n");
    md.push_str(&format!("title: {}\n", quote(&post.title)));
    md.push_str(&format!("slug: {}\n", quote(&post.slug)));
    md.push_str(&format!("url: {}\n", quote(&post.url)));
    md.push_str(&format!("section: {}\n", quote(&post.section)));
    match &post.date {
        Some(date) if date.is_canonical() => {
            md.push_str(&format!("date: {}\n", date.as_str()));
        }
        Some(date) => {
            // Unparseable dates are kept verbatim, never dropped
            md.push_str(&format!("date_raw: {}\n", quote(date.as_str())));
        }
        None => {}
    }
    md.push_str(&format!("categories: {}\n", quote_list(&post.categories)));
    md.push_str(&format!("tags: {}\n", quote_list(&post.tags)));
    md.push_str("---\n\n");

    md.push_str(&format!("# {}\n\n", post.title));
    md.push_str(post.content.trim());
    md.push('\n');

    md
}

fn quote(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn quote_list(values: &[String]) -> String {
    let items: Vec<String> = values.iter().map(|v| quote(v)).collect();
    format!("[{}]", items.join(", "))
}

/// Writes a run summary to `output_path`
///
/// # Arguments
///
/// * `report` - The finalized run report
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn write_run_summary(report: &RunReport, output_path: &Path) -> OutputResult<()> {
    let markdown = format_run_summary(report);

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a run report as markdown
pub fn format_run_summary(report: &RunReport) -> String {
    let mut md = String::new();

    md.push_str("# Archive-Harvest Run Summary\n\n");

    md.push_str("## Run Information\n\n");
    if let Some(run_id) = report.run_id {
        md.push_str(&format!("- **Run ID**: {}\n", run_id));
    }
    md.push_str(&format!("- **Started**: {}\n", report.started_at));
    if let Some(finished) = &report.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished));
    }
    if let Some(duration) = report.duration_ms {
        md.push_str(&format!(
            "- **Duration**: {:.1} seconds\n",
            duration as f64 / 1000.0
        ));
    }
    md.push_str(&format!("- **Status**: {}\n", report.status));
    if let Some(hash) = &report.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push('\n');

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Sections**: {}\n", report.sections.len()));
    md.push_str(&format!("- **Pages Visited**: {}\n", report.pages_visited()));
    md.push_str(&format!("- **Details Saved**: {}\n", report.saved()));
    md.push_str(&format!("- **Details Failed**: {}\n\n", report.failed()));

    if !report.sections.is_empty() {
        md.push_str("## Sections\n\n");
        md.push_str(
            "| Section | Status | Pages | Summaries | Duplicates | Rejected | Saved | Repaired | Failed |\n",
        );
        md.push_str(
            "|---------|--------|-------|-----------|------------|----------|-------|----------|--------|\n",
        );
        for s in &report.sections {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} | {} | {} |\n",
                s.slug,
                s.status,
                s.pages_visited,
                s.summaries_discovered,
                s.duplicates_skipped,
                s.rejected_entries,
                s.saved,
                s.repaired,
                s.failed
            ));
        }
        md.push('\n');
    }

    let errors = report.errors();
    if !errors.is_empty() {
        md.push_str("## Error Summary\n\n");
        md.push_str("| Error Type | Count |\n");
        md.push_str("|------------|-------|\n");

        for (kind, count) in &errors {
            md.push_str(&format!("| {} | {} |\n", kind, count));
        }
        md.push('\n');
    }

    md
}
