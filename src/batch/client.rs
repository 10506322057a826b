use crate::config::ApiConfig;
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::{debug, info};

/// Remote batch lifecycle states. The pipeline only branches on
/// completed / terminal-failure / everything-else, but the full set is
/// modeled so logs show what the service actually reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Validating,
    Queued,
    InProgress,
    Finalizing,
    Completed,
    Failed,
    Expired,
    Cancelling,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl BatchStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, BatchStatus::Completed)
    }

    /// Terminal states that will never become `Completed`.
    pub fn is_terminal_failure(&self) -> bool {
        matches!(
            self,
            BatchStatus::Failed | BatchStatus::Expired | BatchStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Validating => "validating",
            BatchStatus::Queued => "queued",
            BatchStatus::InProgress => "in_progress",
            BatchStatus::Finalizing => "finalizing",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
            BatchStatus::Expired => "expired",
            BatchStatus::Cancelling => "cancelling",
            BatchStatus::Cancelled => "cancelled",
            BatchStatus::Unknown => "unknown",
        }
    }
}

/// What the service reports about a batch.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchInfo {
    pub id: String,
    pub status: BatchStatus,
    #[serde(default)]
    pub output_file_id: Option<String>,
}

/// The external batch API surface the pipeline consumes.
///
/// Two implementations exist: [`HttpBatchClient`] talking to a live
/// OpenAI-compatible endpoint, and [`RecordingBatchClient`] which performs
/// no network I/O. The drivers take `&dyn BatchClient` and never branch on
/// which one they were given.
#[async_trait]
pub trait BatchClient: Send + Sync {
    /// Uploads a batch input file, returning the provider's file id.
    async fn upload_file(&self, path: &Path) -> Result<String>;

    /// Creates a batch over a previously uploaded file.
    async fn create_batch(&self, input_file_id: &str, description: &str) -> Result<BatchInfo>;

    /// Current state of a batch.
    async fn batch_status(&self, batch_id: &str) -> Result<BatchInfo>;

    /// Downloads the raw bytes of a result file. Valid only once the
    /// owning batch reports `Completed`.
    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>>;

    /// Best-effort cancellation of a running batch.
    async fn cancel_batch(&self, batch_id: &str) -> Result<()>;
}

// --- Live implementation ---

#[derive(Deserialize)]
struct FileObject {
    id: String,
}

pub struct HttpBatchClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    endpoint: String,
    completion_window: String,
}

impl HttpBatchClient {
    /// Builds a live client from the API config, reading the key from the
    /// configured environment variable.
    pub fn new(api: &ApiConfig) -> Result<Self> {
        let api_key = std::env::var(&api.api_key_env).map_err(|_| {
            PipelineError::ConfigError(format!(
                "API key not found in environment variable '{}'",
                api.api_key_env
            ))
        })?;
        Ok(HttpBatchClient {
            http: reqwest::Client::new(),
            base_url: api.base_url.clone(),
            api_key,
            endpoint: api.endpoint.clone(),
            completion_window: api.completion_window.clone(),
        })
    }

    /// Maps a non-success HTTP response to `ApiError` with the body text,
    /// which is where the provider puts its diagnostics.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(PipelineError::ApiError(format!(
            "HTTP {}: {}",
            status, body
        )))
    }
}

#[async_trait]
impl BatchClient for HttpBatchClient {
    async fn upload_file(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "batch.jsonl".to_string());
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new()
            .text("purpose", "batch")
            .part("file", part);

        let response = self
            .http
            .post(format!("{}/files", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;
        let file: FileObject = Self::check(response).await?.json().await?;
        debug!(file_id = %file.id, "Uploaded batch input file");
        Ok(file.id)
    }

    async fn create_batch(&self, input_file_id: &str, description: &str) -> Result<BatchInfo> {
        let payload = json!({
            "input_file_id": input_file_id,
            "endpoint": self.endpoint,
            "completion_window": self.completion_window,
            "metadata": { "description": description },
        });
        let response = self
            .http
            .post(format!("{}/batches", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;
        let info: BatchInfo = Self::check(response).await?.json().await?;
        info!(batch_id = %info.id, status = info.status.as_str(), "Created batch");
        Ok(info)
    }

    async fn batch_status(&self, batch_id: &str) -> Result<BatchInfo> {
        let response = self
            .http
            .get(format!("{}/batches/{}", self.base_url, batch_id))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let info: BatchInfo = Self::check(response).await?.json().await?;
        Ok(info)
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(format!("{}/files/{}/content", self.base_url, file_id))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        Ok(Self::check(response).await?.bytes().await?.to_vec())
    }

    async fn cancel_batch(&self, batch_id: &str) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/batches/{}/cancel", self.base_url, batch_id))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        Self::check(response).await?;
        info!(batch_id, "Requested batch cancellation");
        Ok(())
    }
}

// --- Recording (dry-run) implementation ---

/// A call the recording client has observed, for assertions and dry-run
/// inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Upload { path: String },
    Create { input_file_id: String, description: String },
    Status { batch_id: String },
    Download { file_id: String },
    Cancel { batch_id: String },
}

/// No-op stand-in for the live client. Submission and cancellation become
/// local no-ops that mint deterministic `dry-run-*` identifiers, so the
/// request-construction path runs end to end without touching the service.
#[derive(Debug, Default)]
pub struct RecordingBatchClient {
    counter: AtomicU64,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingBatchClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("recording client lock").clone()
    }

    fn record(&self, call: RecordedCall) {
        self.calls.lock().expect("recording client lock").push(call);
    }

    fn next_id(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl BatchClient for RecordingBatchClient {
    async fn upload_file(&self, path: &Path) -> Result<String> {
        let id = format!("dry-run-file-{}", self.next_id());
        info!(path = %path.display(), file_id = %id, "Dry run: skipping file upload");
        self.record(RecordedCall::Upload {
            path: path.display().to_string(),
        });
        Ok(id)
    }

    async fn create_batch(&self, input_file_id: &str, description: &str) -> Result<BatchInfo> {
        let id = format!("dry-run-batch-{}", self.next_id());
        info!(%input_file_id, batch_id = %id, "Dry run: skipping batch creation");
        self.record(RecordedCall::Create {
            input_file_id: input_file_id.to_string(),
            description: description.to_string(),
        });
        Ok(BatchInfo {
            id,
            status: BatchStatus::Validating,
            output_file_id: None,
        })
    }

    async fn batch_status(&self, batch_id: &str) -> Result<BatchInfo> {
        self.record(RecordedCall::Status {
            batch_id: batch_id.to_string(),
        });
        Ok(BatchInfo {
            id: batch_id.to_string(),
            status: BatchStatus::InProgress,
            output_file_id: None,
        })
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>> {
        self.record(RecordedCall::Download {
            file_id: file_id.to_string(),
        });
        Err(PipelineError::ApiError(
            "dry-run client has no result files".to_string(),
        ))
    }

    async fn cancel_batch(&self, batch_id: &str) -> Result<()> {
        info!(batch_id, "Dry run: skipping batch cancellation");
        self.record(RecordedCall::Cancel {
            batch_id: batch_id.to_string(),
        });
        Ok(())
    }
}
