use thiserror::Error;

/// Custom Result type for this crate.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// The Error type for pipeline operations.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Configuration validation error: {0}")]
    ConfigValidationError(String),

    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization/Deserialization error: {source}")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },

    #[error("YAML error: {source}")]
    YamlError {
        #[from]
        source: serde_yaml::Error,
    },

    #[error("HTTP transport error: {source}")]
    HttpError {
        #[from]
        source: reqwest::Error,
    },

    /// Non-transport failures reported by the batch API (bad status codes,
    /// unexpected response shapes, refused uploads).
    #[error("Batch API error: {0}")]
    ApiError(String),

    #[error("Markdown document not found: {path}")]
    DocumentNotFound { path: String },

    /// A result line that could not be mapped back onto a document.
    #[error("Malformed batch result for '{custom_id}': {reason}")]
    MalformedResult { custom_id: String, reason: String },

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}
