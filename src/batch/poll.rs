//! Polling sweep: check every incomplete tracked job once, retrieve and
//! apply results for completed batches, and checkpoint progress.

use crate::batch::client::BatchClient;
use crate::batch::results::{apply_bundle, parse_result_lines};
use crate::config::AppConfig;
use crate::error::Result;
use crate::tracker::JobTracker;
use crate::utils::common::{ensure_directories_exist, write_atomic};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Outcome counters for one polling sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CheckSummary {
    /// Jobs that completed and had their results applied this sweep.
    pub completed: usize,
    /// Jobs still running remotely.
    pub pending: usize,
    /// Jobs in a terminal failure state (left incomplete for resubmission).
    pub failed: usize,
    /// Jobs skipped this sweep because of transient errors.
    pub errors: usize,
    pub documents_updated: usize,
    pub documents_skipped: usize,
}

fn output_path_for(batch_output_dir: &Path, batch_id: &str) -> PathBuf {
    batch_output_dir.join(format!("{}_output.jsonl", batch_id))
}

/// Polls every incomplete job with a batch id exactly once.
///
/// Completed batches are downloaded to
/// `batch_outputs/<batch_id>_output.jsonl` before the merge; if that file
/// already exists from an earlier sweep the download is skipped, so
/// retrieval is idempotent. Terminal failures are logged and the record
/// stays incomplete — resubmission is a human (or outer scheduler)
/// decision, not an automatic retry. Transient errors skip the job until
/// the next sweep. The sweep is safe to run with zero progress.
pub async fn check_and_download_results(
    config: &AppConfig,
    client: &dyn BatchClient,
    tracker: &mut JobTracker,
) -> Result<CheckSummary> {
    let markdown_dir = config.markdown_dir();
    let batch_output_dir = config.batch_output_dir();
    ensure_directories_exist(&[&batch_output_dir])?;

    let mut summary = CheckSummary::default();

    for job in tracker.pollable() {
        let Some(batch_id) = job.batch_id.as_deref() else {
            continue;
        };

        let batch = match client.batch_status(batch_id).await {
            Ok(info) => info,
            Err(e) => {
                warn!(batch_id, filename = %job.filename, error = %e, "Status check failed; will retry next sweep");
                summary.errors += 1;
                continue;
            }
        };

        if batch.status.is_completed() {
            let output_path = output_path_for(&batch_output_dir, batch_id);
            if !output_path.exists() {
                let Some(output_file_id) = batch.output_file_id.as_deref() else {
                    warn!(batch_id, "Batch completed but reported no output file");
                    summary.errors += 1;
                    continue;
                };
                match client.download_file(output_file_id).await {
                    Ok(bytes) => {
                        write_atomic(&output_path, &bytes)?;
                        info!(batch_id, path = %output_path.display(), "Results downloaded");
                    }
                    Err(e) => {
                        warn!(batch_id, error = %e, "Result download failed; will retry next sweep");
                        summary.errors += 1;
                        continue;
                    }
                }
            }

            let content = std::fs::read_to_string(&output_path)?;
            let lines = parse_result_lines(&content);
            let stats = apply_bundle(&markdown_dir, job.job_type, &lines);
            summary.documents_updated += stats.updated;
            summary.documents_skipped += stats.skipped;

            tracker.mark_completed(
                &job.filename,
                job.job_type,
                &output_path.to_string_lossy(),
            );
            tracker.save()?;
            info!(batch_id, filename = %job.filename, job_type = %job.job_type, "Job completed");
            summary.completed += 1;
        } else if batch.status.is_terminal_failure() {
            error!(
                batch_id,
                filename = %job.filename,
                job_type = %job.job_type,
                status = batch.status.as_str(),
                "Batch ended without results; resubmit to retry"
            );
            summary.failed += 1;
        } else {
            info!(
                batch_id,
                filename = %job.filename,
                job_type = %job.job_type,
                status = batch.status.as_str(),
                "Batch still running"
            );
            summary.pending += 1;
        }
    }

    Ok(summary)
}
