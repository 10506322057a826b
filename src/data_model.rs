use serde::{Deserialize, Serialize};
use std::fmt;

/// The enrichment passes a document can be sent through. Serialized in
/// snake_case both in the tracking file and in batch file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Topics,
    Entities,
    Sentiment,
    KeyPoints,
}

impl JobType {
    pub const ALL: [JobType; 4] = [
        JobType::Topics,
        JobType::Entities,
        JobType::Sentiment,
        JobType::KeyPoints,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Topics => "topics",
            JobType::Entities => "entities",
            JobType::Sentiment => "sentiment",
            JobType::KeyPoints => "key_points",
        }
    }

    /// Front-matter field this job type writes into.
    pub fn front_matter_key(&self) -> &'static str {
        match self {
            JobType::Topics => "topics",
            JobType::Entities => "entity_relationships",
            JobType::Sentiment => "overall_sentiment",
            JobType::KeyPoints => "detailed_summary",
        }
    }

    /// Key the model is instructed to use in its JSON response.
    pub fn result_key(&self) -> &'static str {
        match self {
            JobType::Topics => "topics",
            JobType::Entities => "entities",
            JobType::Sentiment => "sentiment",
            JobType::KeyPoints => "key_points",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        JobType::ALL
            .into_iter()
            .find(|jt| jt.as_str() == s)
            .ok_or_else(|| format!("unknown job type '{}'", s))
    }
}

/// One tracked batch job. Uniqueness key is `(filename, job_type)`;
/// records are never removed, so the file doubles as an audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub filename: String,
    pub job_type: JobType,
    pub batch_id: Option<String>,
    pub completed: bool,
    pub output_file: Option<String>,
}

/// Persisted shape of the tracking file: `{"jobs": [...]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackingData {
    pub jobs: Vec<JobRecord>,
}

// --- Batch request wire format (one JSON object per JSONL line) ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessagePayload {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionBody {
    pub model: String,
    pub messages: Vec<ChatMessagePayload>,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequestLine {
    pub custom_id: String,
    pub method: String,
    pub url: String,
    pub body: ChatCompletionBody,
}

// --- Batch result wire format ---
// Only the fields this pipeline reads are modeled; everything else in the
// provider's envelope is ignored during deserialization.

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionBody {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchResponse {
    pub body: CompletionBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchResultLine {
    pub custom_id: String,
    pub response: BatchResponse,
}

// --- Extracted chat messages (generator input) ---

/// One message from the chat export, keyed by day in the input JSON file.
/// The database extraction that produces this file is a separate concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub text: String,
    /// UTC timestamp, `YYYY-MM-DD HH:MM:SS`.
    pub sent_at: String,
    #[serde(default)]
    pub replied_to: Option<i64>,
    #[serde(default)]
    pub attachment: Option<String>,
}

// --- Tag clustering ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagCluster {
    pub cluster_name: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagClusterFile {
    pub clusters: Vec<TagCluster>,
}
