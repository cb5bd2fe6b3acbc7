//! Archive-Harvest main entry point
//!
//! This is the command-line interface for the Archive-Harvest section harvester.

use anyhow::Context;
use archive_harvest::config::{load_config_with_hash, Config};
use archive_harvest::crawler::{run_harvest, CancelFlag, HarvestOptions};
use archive_harvest::output::{
    generate_summary, load_statistics, print_statistics, write_run_summary, DocumentSink,
    RecordSink,
};
use archive_harvest::storage::{self, SqliteStorage, Storage};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Archive-Harvest: an incremental harvester for paginated archives
///
/// Archive-Harvest walks the listing pages of each configured section,
/// extracts one structured record per post through a remote extraction
/// service, and stores it. Posts harvested by earlier runs are skipped.
#[derive(Parser, Debug)]
#[command(name = "archive-harvest")]
#[command(version)]
#[command(about = "An incremental harvester for paginated archives", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Re-extract posts that are already in the database
    #[arg(long)]
    fresh: bool,

    /// Only harvest the named section (repeatable)
    #[arg(long = "section", value_name = "SLUG")]
    sections: Vec<String>,

    /// Validate config and show what would be harvested without harvesting
    #[arg(long, conflicts_with_all = ["stats", "export_documents", "export_summary"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_documents", "export_summary"])]
    stats: bool,

    /// Re-render every stored post as a markdown document and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "export_summary"])]
    export_documents: bool,

    /// Write the latest run's markdown summary and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "export_documents"])]
    export_summary: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config, &cli.sections)
    } else if cli.stats {
        handle_stats(&config)
    } else if cli.export_documents {
        handle_export_documents(&config, &cli.sections)
    } else if cli.export_summary {
        handle_export_summary(&config)
    } else {
        let options = HarvestOptions {
            fresh: cli.fresh,
            sections: cli.sections,
        };
        handle_harvest(&config, &config_hash, options).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("archive_harvest=info,warn"),
            1 => EnvFilter::new("archive_harvest=debug,info"),
            2 => EnvFilter::new("archive_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be harvested
fn handle_dry_run(config: &Config, only: &[String]) -> anyhow::Result<()> {
    let sections = config.resolve_sections(only)?;

    println!("=== Archive-Harvest Dry Run ===\n");

    println!("Harvester Configuration:");
    println!(
        "  Max pages per section: {}",
        config.harvester.max_pages_per_section
    );
    println!(
        "  Max attempts per extraction: {}",
        config.harvester.max_detail_attempts
    );
    println!("  Retry backoff unit: {}ms", config.harvester.retry_backoff_ms);
    println!(
        "  Session failure threshold: {}",
        config.harvester.session_failure_threshold
    );

    println!("\nExtraction Backend:");
    println!("  Endpoint: {}", config.backend.endpoint);
    println!(
        "  API key: {}",
        if config.backend.api_key.is_some() { "set" } else { "none" }
    );
    println!("  Timeout: {}s", config.backend.timeout_secs);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!(
        "  Documents: {}",
        config.output.documents_dir.as_deref().unwrap_or("(disabled)")
    );
    println!(
        "  Telemetry: {}",
        config.output.telemetry_path.as_deref().unwrap_or("(disabled)")
    );
    println!(
        "  Summary: {}",
        config.output.summary_path.as_deref().unwrap_or("(disabled)")
    );

    println!("\nSections ({}):", sections.len());
    for section in &sections {
        println!("  - {} ({}): {}", section.slug, section.name, section.base_url);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would harvest {} sections", sections.len());

    Ok(())
}

fn open_storage(config: &Config) -> anyhow::Result<SqliteStorage> {
    storage::open_storage(Path::new(&config.output.database_path))
        .with_context(|| format!("Failed to open database {}", config.output.database_path))
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(config)?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export-documents mode: re-renders stored posts
fn handle_export_documents(config: &Config, only: &[String]) -> anyhow::Result<()> {
    let dir = config
        .output
        .documents_dir
        .as_deref()
        .context("documents-dir is not configured")?;

    println!("=== Exporting Documents ===\n");
    println!("Database: {}", config.output.database_path);
    println!("Output: {}", dir);
    println!();

    let sections = config.resolve_sections(only)?;
    let storage = open_storage(config)?;
    let sink = DocumentSink::new(dir);

    let mut written = 0;
    for section in &sections {
        for post in storage.list_posts(Some(section.slug.as_str()))? {
            sink.accept(&post)?;
            written += 1;
        }
    }

    println!("✓ {} documents written to: {}", written, dir);

    Ok(())
}

/// Handles the --export-summary mode: writes the latest run's report
fn handle_export_summary(config: &Config) -> anyhow::Result<()> {
    let path = config
        .output
        .summary_path
        .as_deref()
        .context("summary-path is not configured")?;

    println!("=== Exporting Harvest Summary ===\n");
    println!("Database: {}", config.output.database_path);
    println!("Output: {}", path);
    println!();

    let storage = open_storage(config)?;

    tracing::info!("Loading run data from database...");
    let report = generate_summary(&storage)?;

    write_run_summary(&report, Path::new(path))?;

    println!("✓ Summary exported to: {}", path);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(
    config: &Config,
    config_hash: &str,
    options: HarvestOptions,
) -> anyhow::Result<()> {
    if options.fresh {
        tracing::info!("Starting fresh harvest (previously stored posts are re-extracted)");
    } else {
        tracing::info!("Starting incremental harvest");
    }

    let cancel = CancelFlag::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing the current item");
            on_signal.cancel();
        }
    });

    let report = run_harvest(config, config_hash, &options, cancel)
        .await
        .context("Harvest failed")?;

    tracing::info!(
        "Harvest {}: {} pages visited, {} posts saved, {} failed",
        report.status,
        report.pages_visited(),
        report.saved(),
        report.failed()
    );

    Ok(())
}
