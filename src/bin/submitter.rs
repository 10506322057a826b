// src/bin/submitter.rs

use anyhow::Context;
use clap::Parser;
use std::str::FromStr;
use tracing::info;
use ChatScribe::batch::client::{BatchClient, HttpBatchClient, RecordingBatchClient};
use ChatScribe::batch::submit::process_markdown_files;
use ChatScribe::config::submitter::Args;
use ChatScribe::config::load_app_config;
use ChatScribe::data_model::JobType;
use ChatScribe::tracker::JobTracker;
use ChatScribe::utils::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = load_app_config(&args.config)
        .with_context(|| format!("loading config from {}", args.config.display()))?;
    let _guard = init_logging(&config.error_logs_dir())?;

    let job_types = if args.job_types.is_empty() {
        JobType::ALL.to_vec()
    } else {
        args.job_types
            .iter()
            .map(|s| JobType::from_str(s).map_err(anyhow::Error::msg))
            .collect::<anyhow::Result<Vec<_>>>()?
    };

    // The client implementation is chosen exactly once; the driver never
    // branches on dry-run again.
    let client: Box<dyn BatchClient> = if args.dry_run {
        info!("Dry-run mode: using the recording client");
        Box::new(RecordingBatchClient::new())
    } else {
        Box::new(HttpBatchClient::new(config.api()?)?)
    };

    let mut tracker = JobTracker::load(config.tracking_file());
    info!(
        tracking_file = %tracker.path().display(),
        job_types = ?job_types.iter().map(JobType::as_str).collect::<Vec<_>>(),
        "Submitter starting"
    );

    let summary = process_markdown_files(&config, client.as_ref(), &mut tracker, &job_types).await?;
    info!(
        submitted = summary.submitted,
        failed = summary.failed,
        aborted = ?summary
            .aborted_job_types
            .iter()
            .map(JobType::as_str)
            .collect::<Vec<_>>(),
        "Submission run finished"
    );
    Ok(())
}
