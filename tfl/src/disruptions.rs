//! # disruptions
//!
//! One pipeline run: fetch the live TfL road disruption list (or fall back to
//! the cached snapshots), refresh the snapshot files, archive them under
//! today's date and log a summary. Meant to be invoked by an external
//! scheduler; exits non-zero on configuration or archive failures.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use tracing::{error, info, warn};

use lib_roadwatch::configs::{Credentials, PipelineConfig};
use lib_roadwatch::loggers::{setup_logging, LoggerLocalOptions};
use lib_roadwatch::roads::summary;
use lib_roadwatch::roads::{DisruptionRecord, SeverePolicy, SeverityCatalog};
use lib_roadwatch::{Pipeline, PipelineReport, RecordSource};

#[derive(Debug, Parser)]
#[command(version, about = "Fetch, snapshot and archive TfL road disruptions")]
struct Args {
    /// Directory holding the latest snapshots and the `data/` archive.
    #[arg(long, env = "ROADWATCH_WORK_DIR", default_value = ".")]
    work_dir: PathBuf,

    /// Override the disruption endpoint.
    #[arg(long, env = "TFL_API_URL")]
    api_url: Option<String>,

    /// YAML or JSON list of `{severityLevel, description}` entries.
    #[arg(long, env = "ROADWATCH_SEVERITY_CATALOG")]
    severity_catalog: Option<PathBuf>,

    /// Archive under this date (YYYY-MM-DD) instead of today.
    #[arg(long)]
    date: Option<NaiveDate>,

    #[arg(long, default_value_t = 3)]
    max_retries: u32,

    /// Extra file, relative to the work dir, copied into each archive entry. Repeatable.
    #[arg(long = "artifact")]
    artifacts: Vec<String>,

    /// Treat `severityLevel <= N` as severe instead of the "Serious" label.
    #[arg(long)]
    severe_level: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // load .env files before anything else
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // The guard must live until the end of main so buffered lines reach the file.
    let _guard = match setup_logging(&LoggerLocalOptions::from_env("disruptions")) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(args).await {
        error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    let credentials = Credentials::from_env().context("Loading TfL credentials")?;

    let mut config = PipelineConfig::new(credentials, &args.work_dir)
        .with_max_retries(args.max_retries)
        .with_archive_artifacts(args.artifacts);
    if let Some(url) = args.api_url.as_deref() {
        config = config.with_endpoint(url).context("Parsing --api-url")?;
    }
    info!("{}", config);

    let catalog = match &args.severity_catalog {
        Some(path) => SeverityCatalog::load(path)
            .with_context(|| format!("Loading severity catalog {}", path.display()))?,
        None => SeverityCatalog::default(),
    };

    let policy = match args.severe_level {
        Some(level) => SeverePolicy::MaxLevel(level),
        None => SeverePolicy::default(),
    };

    let today = args.date.unwrap_or_else(|| Local::now().date_naive());

    let pipeline = Pipeline::from_config(&config).context("Building the HTTP client")?;
    let report = pipeline.run(today).await.context("Pipeline run failed")?;

    log_report(&report);
    log_summary(report.records(), &catalog, &policy);
    Ok(())
}

fn log_report(report: &PipelineReport) {
    match report.source {
        RecordSource::Fresh => info!(records = report.records.len(), "Using fresh disruptions"),
        RecordSource::Cache(tier) => warn!(
            records = report.records.len(),
            tier = tier.tier(),
            file = %tier,
            "Using cached disruptions"
        ),
        RecordSource::None => warn!("No disruptions available from the API or the cache"),
    }

    if let Some(snapshot) = &report.snapshot {
        for failure in &snapshot.failed {
            warn!("Snapshot not refreshed: {}", failure);
        }
    }

    info!(
        date = %report.archive.date,
        directory = %report.archive.directory.display(),
        copied = report.archive.copied.len(),
        skipped = report.archive.skipped.len(),
        manifest_changed = report.archive.manifest_changed,
        "Archived"
    );
}

fn log_summary(records: &[DisruptionRecord], catalog: &SeverityCatalog, policy: &SeverePolicy) {
    if records.is_empty() {
        return;
    }

    for (severity, count) in summary::severity_counts(records) {
        info!(severity = %severity, count, "By severity");
    }
    for (category, count) in summary::category_counts(records) {
        info!(category = %category, count, "By category");
    }
    for (sub_category, count) in summary::sub_category_counts(records) {
        info!(sub_category = %sub_category, count, "By sub-category");
    }
    if !catalog.is_empty() {
        for row in summary::severity_level_counts(records, catalog) {
            info!(
                severity_level = row.severity_level,
                description = row.description.as_deref().unwrap_or("<unknown>"),
                count = row.count,
                "By severity level"
            );
        }
    }

    let severe = summary::severe(records, policy);
    let located = summary::located(records);
    info!(
        total = records.len(),
        severe = severe.len(),
        located = located.len(),
        policy = ?policy,
        "Disruption summary"
    );
    for record in severe {
        info!(id = %record.label(), severity = record.severity.as_deref().unwrap_or(""), "Severe disruption");
    }
}
