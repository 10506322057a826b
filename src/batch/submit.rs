//! Batch submission: request construction, input-file writing, and the
//! per-document submission driver with rollback on failure.

use crate::batch::client::{BatchClient, BatchInfo};
use crate::config::{ApiConfig, AppConfig};
use crate::data_model::{BatchRequestLine, ChatCompletionBody, JobType};
use crate::error::{PipelineError, Result};
use crate::markdown::{list_markdown_files, MarkdownDocument};
use crate::prompts::build_messages;
use crate::tracker::JobTracker;
use crate::utils::common::{ensure_directories_exist, to_jsonl, write_atomic};
use crate::utils::text::clean_conversation;
use indicatif::ProgressBar;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Outcome counters for one submission run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SubmitSummary {
    pub submitted: usize,
    pub failed: usize,
    /// Job types whose submission was abandoned after a failure, so no
    /// partial/inconsistent batch set exists for them.
    pub aborted_job_types: Vec<JobType>,
}

/// The text sent as the user message for one (document, job_type) pair.
///
/// Key-point extraction additionally gets the document's current topic,
/// entity and sentiment front-matter as context ahead of the conversation.
pub fn request_text(document: &MarkdownDocument, job_type: JobType) -> Result<String> {
    let cleaned = clean_conversation(&document.render()?);
    if job_type != JobType::KeyPoints {
        return Ok(cleaned);
    }

    let mut context = String::new();
    for key in ["topics", "entity_relationships", "overall_sentiment"] {
        if let Some(value) = document.front_matter_value(key) {
            if !value.is_null() {
                context.push_str(&serde_yaml::to_string(value)?);
            }
        }
    }
    if context.is_empty() {
        Ok(cleaned)
    } else {
        Ok(format!("{}\n{}", context, cleaned))
    }
}

/// Builds the request line for one (document, job_type) pair. The
/// document's file name becomes the custom_id echoed back in the result.
pub fn build_request_line(
    api: &ApiConfig,
    document: &MarkdownDocument,
    job_type: JobType,
) -> Result<BatchRequestLine> {
    let text = request_text(document, job_type)?;
    Ok(BatchRequestLine {
        custom_id: document.file_name.clone(),
        method: "POST".to_string(),
        url: api.endpoint.clone(),
        body: ChatCompletionBody {
            model: api.model.clone(),
            messages: build_messages(job_type, &text),
            max_tokens: api.max_tokens,
        },
    })
}

/// Writes the request line as `<input_dir>/<job_type>/<file>_<job_type>.jsonl`.
/// The write is atomic, so a failed run never leaves a partial batch file.
pub fn write_batch_input(
    batch_input_dir: &Path,
    job_type: JobType,
    line: &BatchRequestLine,
) -> Result<PathBuf> {
    let dir = batch_input_dir.join(job_type.as_str());
    ensure_directories_exist(&[&dir])?;
    let path = dir.join(format!("{}_{}.jsonl", line.custom_id, job_type));
    write_atomic(&path, to_jsonl(std::slice::from_ref(line))?.as_bytes())?;
    Ok(path)
}

/// Cancels an already-created batch (best-effort) and writes a dedicated
/// per-document error record.
pub async fn rollback_on_error(
    client: &dyn BatchClient,
    batch_id: Option<&str>,
    filename: &str,
    job_type: JobType,
    error_message: &str,
    error_logs_dir: &Path,
) {
    error!(filename, job_type = %job_type, error_message, "Submission failed");

    if let Some(batch_id) = batch_id {
        info!(batch_id, filename, job_type = %job_type, "Cancelling batch after failure");
        if let Err(cancel_err) = client.cancel_batch(batch_id).await {
            warn!(batch_id, error = %cancel_err, "Batch cancellation failed");
        }
    }

    if let Err(log_err) = append_error_record(error_logs_dir, filename, job_type, error_message) {
        warn!(error = %log_err, "Could not write error record");
    }
}

fn append_error_record(
    error_logs_dir: &Path,
    filename: &str,
    job_type: JobType,
    error_message: &str,
) -> Result<()> {
    ensure_directories_exist(&[error_logs_dir])?;
    let path = error_logs_dir.join(format!("{}_{}_error.log", filename, job_type));
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(
        file,
        "Error processing {} for {}:\n{}\n",
        job_type, filename, error_message
    )?;
    Ok(())
}

async fn try_submit(
    api: &ApiConfig,
    client: &dyn BatchClient,
    batch_input_dir: &Path,
    doc_path: &Path,
    job_type: JobType,
) -> Result<BatchInfo> {
    let document = MarkdownDocument::load(doc_path)?;
    let line = build_request_line(api, &document, job_type)?;
    let batch_file = write_batch_input(batch_input_dir, job_type, &line)?;
    let file_id = client.upload_file(&batch_file).await?;
    client
        .create_batch(&file_id, &format!("{}_{}_Batch", line.custom_id, job_type))
        .await
}

/// Submission driver: one batch per (document, job_type) pair.
///
/// The tracker is updated (and persisted) only after the service has
/// accepted a batch, so no id is ever recorded that was never created. A
/// failure for one pair rolls back, writes its error record and abandons
/// the rest of that job_type for this run; the other job types continue.
/// Tracker persistence failures abort the whole run after cancelling the
/// batch they would have recorded.
pub async fn process_markdown_files(
    config: &AppConfig,
    client: &dyn BatchClient,
    tracker: &mut JobTracker,
    job_types: &[JobType],
) -> Result<SubmitSummary> {
    let api = config.api()?;
    let markdown_dir = config.markdown_dir();
    let batch_input_dir = config.batch_input_dir();
    let error_logs_dir = config.error_logs_dir();

    let md_files = list_markdown_files(&markdown_dir)?;
    info!(
        count = md_files.len(),
        "Found markdown files. Starting batch submission"
    );

    let mut summary = SubmitSummary::default();
    let mut aborted: HashSet<JobType> = HashSet::new();
    let progress = ProgressBar::new(md_files.len() as u64);

    for doc_path in &md_files {
        let filename = doc_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        for &job_type in job_types {
            if aborted.contains(&job_type) {
                continue;
            }

            match try_submit(api, client, &batch_input_dir, doc_path, job_type).await {
                Ok(batch) => {
                    tracker.upsert(&filename, job_type, &batch.id);
                    if let Err(save_err) = tracker.save() {
                        rollback_on_error(
                            client,
                            Some(&batch.id),
                            &filename,
                            job_type,
                            &save_err.to_string(),
                            &error_logs_dir,
                        )
                        .await;
                        progress.finish_and_clear();
                        return Err(save_err);
                    }
                    info!(filename = %filename, job_type = %job_type, batch_id = %batch.id, "Batch submitted");
                    summary.submitted += 1;
                }
                Err(e) => {
                    rollback_on_error(
                        client,
                        None,
                        &filename,
                        job_type,
                        &e.to_string(),
                        &error_logs_dir,
                    )
                    .await;
                    aborted.insert(job_type);
                    summary.failed += 1;
                }
            }
        }

        progress.inc(1);
        if aborted.len() == job_types.len() && !job_types.is_empty() {
            warn!("All job types aborted; stopping submission early");
            break;
        }
    }
    progress.finish_and_clear();

    summary.aborted_job_types = job_types
        .iter()
        .copied()
        .filter(|jt| aborted.contains(jt))
        .collect();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;

    fn test_api_config() -> ApiConfig {
        serde_yaml::from_str("{}").unwrap()
    }

    fn sample_document() -> MarkdownDocument {
        MarkdownDocument::parse(
            "2024-03-09.md",
            "---\ntopics:\n- family\noverall_sentiment:\n  sentiment: Negative\n---\n\n**Jason**: hello\n  08:15 AM\n",
        )
        .unwrap()
    }

    #[test]
    fn test_build_request_line_shape() {
        let api = test_api_config();
        let line = build_request_line(&api, &sample_document(), JobType::Topics).unwrap();

        assert_eq!(line.custom_id, "2024-03-09.md");
        assert_eq!(line.method, "POST");
        assert_eq!(line.url, "/v1/chat/completions");
        assert_eq!(line.body.model, "gpt-4o");
        assert_eq!(line.body.max_tokens, 1000);
        assert_eq!(line.body.messages.len(), 2);
        assert_eq!(line.body.messages[0].role, "system");
        let user = &line.body.messages[1];
        assert_eq!(user.role, "user");
        assert!(user.content.contains("**Jason**: hello"));
        assert!(!user.content.contains("08:15 AM"));
        assert!(!user.content.contains("topics"));
    }

    #[test]
    fn test_request_text_key_points_includes_context() {
        let text = request_text(&sample_document(), JobType::KeyPoints).unwrap();
        assert!(text.contains("family"));
        assert!(text.contains("Negative"));
        assert!(text.contains("**Jason**: hello"));
    }

    #[test]
    fn test_request_text_key_points_without_context() {
        let doc = MarkdownDocument::parse("d.md", "**Jason**: hello\n").unwrap();
        let text = request_text(&doc, JobType::KeyPoints).unwrap();
        assert_eq!(text, "**Jason**: hello");
    }

    #[test]
    fn test_write_batch_input_layout() {
        let dir = tempfile::tempdir().unwrap();
        let api = test_api_config();
        let line = build_request_line(&api, &sample_document(), JobType::Sentiment).unwrap();

        let path = write_batch_input(dir.path(), JobType::Sentiment, &line).unwrap();
        assert_eq!(
            path,
            dir.path().join("sentiment/2024-03-09.md_sentiment.jsonl")
        );

        let written = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(written.trim()).unwrap();
        assert_eq!(parsed["custom_id"], "2024-03-09.md");
        assert_eq!(parsed["body"]["messages"][0]["role"], "system");
    }
}
