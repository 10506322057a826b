// src/bin/checker.rs
//
// Polling sweep over the tracked batch jobs. Designed to be run repeatedly
// (e.g. from cron); a sweep with zero progress is a no-op.

use anyhow::Context;
use clap::Parser;
use tracing::info;
use ChatScribe::batch::client::{BatchClient, HttpBatchClient, RecordingBatchClient};
use ChatScribe::batch::poll::check_and_download_results;
use ChatScribe::config::checker::Args;
use ChatScribe::config::load_app_config;
use ChatScribe::tracker::JobTracker;
use ChatScribe::utils::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = load_app_config(&args.config)
        .with_context(|| format!("loading config from {}", args.config.display()))?;
    let _guard = init_logging(&config.error_logs_dir())?;

    let client: Box<dyn BatchClient> = if args.dry_run {
        info!("Dry-run mode: using the recording client");
        Box::new(RecordingBatchClient::new())
    } else {
        Box::new(HttpBatchClient::new(config.api()?)?)
    };

    let mut tracker = JobTracker::load(config.tracking_file());
    info!(
        pollable = tracker.pollable().len(),
        "Checker starting sweep"
    );

    let summary = check_and_download_results(&config, client.as_ref(), &mut tracker).await?;
    info!(
        completed = summary.completed,
        pending = summary.pending,
        failed = summary.failed,
        errors = summary.errors,
        documents_updated = summary.documents_updated,
        documents_skipped = summary.documents_skipped,
        "Sweep finished"
    );
    Ok(())
}
