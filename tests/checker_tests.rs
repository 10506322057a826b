#[cfg(test)]
mod args_tests {
    use clap::Parser;
    use std::path::PathBuf;
    pub use ChatScribe::config::checker::Args;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(&["checker"]);
        assert_eq!(args.config, PathBuf::from("config/app.yaml"));
        assert!(!args.dry_run);
    }

    #[test]
    fn test_dry_run_flag() {
        let args = Args::parse_from(&["checker", "--dry-run"]);
        assert!(args.dry_run);
    }
}

#[cfg(test)]
mod polling_flow_tests {
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use ChatScribe::batch::client::{BatchClient, BatchInfo, BatchStatus};
    use ChatScribe::batch::poll::check_and_download_results;
    use ChatScribe::config::AppConfig;
    use ChatScribe::data_model::JobType;
    use ChatScribe::error::{PipelineError, Result};
    use ChatScribe::markdown::MarkdownDocument;
    use ChatScribe::tracker::JobTracker;

    fn test_config(dir: &TempDir) -> AppConfig {
        AppConfig {
            data_dir: dir.path().to_path_buf(),
            api: Some(serde_yaml::from_str("{}").unwrap()),
            participants: Default::default(),
            utc_offset_hours: 0,
        }
    }

    /// Serves canned statuses and result files, counting downloads.
    #[derive(Default)]
    struct MockBatchClient {
        statuses: HashMap<String, BatchInfo>,
        outputs: HashMap<String, Vec<u8>>,
        downloads: Mutex<Vec<String>>,
    }

    impl MockBatchClient {
        fn with_batch(mut self, batch_id: &str, status: BatchStatus, output: Option<&str>) -> Self {
            self.statuses.insert(
                batch_id.to_string(),
                BatchInfo {
                    id: batch_id.to_string(),
                    status,
                    output_file_id: output.map(str::to_string),
                },
            );
            self
        }

        fn with_output(mut self, file_id: &str, bytes: Vec<u8>) -> Self {
            self.outputs.insert(file_id.to_string(), bytes);
            self
        }

        fn download_count(&self) -> usize {
            self.downloads.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl BatchClient for MockBatchClient {
        async fn upload_file(&self, _path: &Path) -> Result<String> {
            Err(PipelineError::ApiError("not used in polling".to_string()))
        }

        async fn create_batch(&self, _input_file_id: &str, _description: &str) -> Result<BatchInfo> {
            Err(PipelineError::ApiError("not used in polling".to_string()))
        }

        async fn batch_status(&self, batch_id: &str) -> Result<BatchInfo> {
            self.statuses
                .get(batch_id)
                .cloned()
                .ok_or_else(|| PipelineError::ApiError(format!("unknown batch {}", batch_id)))
        }

        async fn download_file(&self, file_id: &str) -> Result<Vec<u8>> {
            self.downloads.lock().unwrap().push(file_id.to_string());
            self.outputs
                .get(file_id)
                .cloned()
                .ok_or_else(|| PipelineError::ApiError(format!("unknown file {}", file_id)))
        }

        async fn cancel_batch(&self, _batch_id: &str) -> Result<()> {
            Ok(())
        }
    }

    fn result_line(custom_id: &str, content: serde_json::Value) -> String {
        json!({
            "custom_id": custom_id,
            "response": {"body": {"choices": [{"message": {"content": content.to_string()}}]}}
        })
        .to_string()
    }

    fn write_markdown(config: &AppConfig, name: &str) {
        let dir = config.markdown_dir();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(name), "---\ntopics:\n---\n\nbody text\n").unwrap();
    }

    #[tokio::test]
    async fn test_sweep_applies_completed_jobs_and_leaves_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        write_markdown(&config, "2024-03-09.md");

        let bundle = format!(
            "{}\n{}\n",
            result_line("2024-03-09.md", json!({"topics": ["family"]})),
            result_line("missing.md", json!({"topics": ["lost"]})),
        );
        let client = MockBatchClient::default()
            .with_batch("batch-done", BatchStatus::Completed, Some("file-out"))
            .with_batch("batch-running", BatchStatus::InProgress, None)
            .with_batch("batch-dead", BatchStatus::Failed, None)
            .with_output("file-out", bundle.into_bytes());

        let mut tracker = JobTracker::load(config.tracking_file());
        tracker.upsert("2024-03-09.md", JobType::Topics, "batch-done");
        tracker.upsert("2024-03-09.md", JobType::Sentiment, "batch-running");
        tracker.upsert("2024-03-09.md", JobType::Entities, "batch-dead");
        tracker.save().unwrap();

        let summary = check_and_download_results(&config, &client, &mut tracker)
            .await
            .unwrap();

        assert_eq!(summary.completed, 1);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.errors, 0);
        // The bundle carried one applicable line and one unknown custom_id.
        assert_eq!(summary.documents_updated, 1);
        assert_eq!(summary.documents_skipped, 1);

        // Result bundle persisted before merging.
        let output_path = config.batch_output_dir().join("batch-done_output.jsonl");
        assert!(output_path.exists());

        // Document got its merged front-matter, body untouched.
        let doc = MarkdownDocument::load(&config.markdown_dir().join("2024-03-09.md")).unwrap();
        assert_eq!(
            doc.front_matter_value("topics"),
            Some(&serde_yaml::from_str("[family]").unwrap())
        );
        assert_eq!(doc.body, "body text\n");

        // Tracker state: completed job checkpointed, others untouched.
        let jobs = tracker.jobs();
        let done = jobs
            .iter()
            .find(|j| j.batch_id.as_deref() == Some("batch-done"))
            .unwrap();
        assert!(done.completed);
        assert_eq!(
            done.output_file.as_deref(),
            Some(output_path.to_string_lossy().as_ref())
        );
        assert!(jobs
            .iter()
            .filter(|j| j.batch_id.as_deref() != Some("batch-done"))
            .all(|j| !j.completed && j.output_file.is_none()));

        // A failed batch is left for manual resubmission, not retried.
        let reloaded = JobTracker::load(config.tracking_file());
        assert_eq!(reloaded.pollable().len(), 2);
    }

    #[tokio::test]
    async fn test_second_sweep_makes_no_further_progress() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        write_markdown(&config, "2024-03-09.md");

        let bundle = result_line("2024-03-09.md", json!({"topics": ["family"]}));
        let client = MockBatchClient::default()
            .with_batch("batch-done", BatchStatus::Completed, Some("file-out"))
            .with_output("file-out", format!("{}\n", bundle).into_bytes());

        let mut tracker = JobTracker::load(config.tracking_file());
        tracker.upsert("2024-03-09.md", JobType::Topics, "batch-done");
        tracker.save().unwrap();

        let first = check_and_download_results(&config, &client, &mut tracker)
            .await
            .unwrap();
        assert_eq!(first.completed, 1);
        assert_eq!(client.download_count(), 1);

        let doc_after_first =
            MarkdownDocument::load(&config.markdown_dir().join("2024-03-09.md")).unwrap();

        // Completed jobs drop out of the pollable set, so the second sweep
        // is a no-op: no polls, no downloads, no document changes.
        let second = check_and_download_results(&config, &client, &mut tracker)
            .await
            .unwrap();
        assert_eq!(second.completed, 0);
        assert_eq!(second.pending, 0);
        assert_eq!(client.download_count(), 1);

        let doc_after_second =
            MarkdownDocument::load(&config.markdown_dir().join("2024-03-09.md")).unwrap();
        assert_eq!(doc_after_first, doc_after_second);
    }

    #[tokio::test]
    async fn test_existing_output_file_skips_download() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        write_markdown(&config, "2024-03-09.md");

        // The bundle is already on disk from an earlier sweep; the client
        // has no copy to serve, so any download attempt would fail.
        std::fs::create_dir_all(config.batch_output_dir()).unwrap();
        std::fs::write(
            config.batch_output_dir().join("batch-done_output.jsonl"),
            format!(
                "{}\n",
                result_line("2024-03-09.md", json!({"topics": ["family"]}))
            ),
        )
        .unwrap();

        let client = MockBatchClient::default().with_batch(
            "batch-done",
            BatchStatus::Completed,
            Some("file-out"),
        );

        let mut tracker = JobTracker::load(config.tracking_file());
        tracker.upsert("2024-03-09.md", JobType::Topics, "batch-done");
        tracker.save().unwrap();

        let summary = check_and_download_results(&config, &client, &mut tracker)
            .await
            .unwrap();
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.documents_updated, 1);
        assert_eq!(client.download_count(), 0);
    }

    #[tokio::test]
    async fn test_transient_status_error_leaves_job_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        write_markdown(&config, "2024-03-09.md");

        // The client knows nothing about this batch id: every status call
        // fails as if the service were unreachable.
        let client = MockBatchClient::default();

        let mut tracker = JobTracker::load(config.tracking_file());
        tracker.upsert("2024-03-09.md", JobType::Topics, "batch-unknown");
        tracker.save().unwrap();

        let summary = check_and_download_results(&config, &client, &mut tracker)
            .await
            .unwrap();
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.completed, 0);

        // Still pollable next sweep.
        assert_eq!(tracker.pollable().len(), 1);
    }
}
