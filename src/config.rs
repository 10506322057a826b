// src/config.rs
use crate::error::{PipelineError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

// Per-binary command-line argument structs live in src/config/ so that
// integration tests can import them.
pub mod checker;
pub mod generator;
pub mod submitter;
pub mod tagger;

/// Settings for talking to the batch API.
#[derive(Deserialize, Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the OpenAI-compatible API, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Environment variable holding the API key. The key itself is never
    /// written to the config file.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Completion window requested at batch creation, e.g. "24h".
    #[serde(default = "default_completion_window")]
    pub completion_window: String,
    /// Endpoint recorded in each batch request line.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_completion_window() -> String {
    "24h".to_string()
}

fn default_endpoint() -> String {
    "/v1/chat/completions".to_string()
}

impl ApiConfig {
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(PipelineError::ConfigValidationError(
                "ApiConfig: base_url cannot be empty".to_string(),
            ));
        }
        if self.base_url.ends_with('/') {
            return Err(PipelineError::ConfigValidationError(format!(
                "ApiConfig: base_url must not end with a slash, got '{}'",
                self.base_url
            )));
        }
        if self.model.is_empty() {
            return Err(PipelineError::ConfigValidationError(
                "ApiConfig: model cannot be empty".to_string(),
            ));
        }
        if self.max_tokens == 0 {
            return Err(PipelineError::ConfigValidationError(
                "ApiConfig: max_tokens must be greater than 0".to_string(),
            ));
        }
        if self.completion_window.is_empty() {
            return Err(PipelineError::ConfigValidationError(
                "ApiConfig: completion_window cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Application configuration read from YAML. Every component receives this
/// (or a piece of it) explicitly; there is no process-wide singleton.
#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    /// Root of all pipeline state (markdown, batch files, tracking, logs).
    pub data_dir: PathBuf,
    #[serde(default)]
    pub api: Option<ApiConfig>,
    /// Maps raw participant identifiers from the chat export to display
    /// names. Messages with no sender identifier use the `~` (null) key.
    #[serde(default)]
    pub participants: HashMap<Option<String>, String>,
    /// Offset from UTC, in hours, used when rendering message times.
    #[serde(default)]
    pub utc_offset_hours: i32,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(PipelineError::ConfigValidationError(
                "AppConfig: data_dir cannot be empty".to_string(),
            ));
        }
        if !(-23..=23).contains(&self.utc_offset_hours) {
            return Err(PipelineError::ConfigValidationError(format!(
                "AppConfig: utc_offset_hours must be between -23 and 23, got {}",
                self.utc_offset_hours
            )));
        }
        if let Some(api) = &self.api {
            api.validate()?;
        }
        Ok(())
    }

    /// API settings, or a config error for binaries that need them.
    pub fn api(&self) -> Result<&ApiConfig> {
        self.api.as_ref().ok_or_else(|| {
            PipelineError::ConfigError(
                "missing 'api' section in application config".to_string(),
            )
        })
    }

    // Directory layout under data_dir. Created on demand by the binaries.

    pub fn markdown_dir(&self) -> PathBuf {
        self.data_dir.join("markdown")
    }

    pub fn batch_input_dir(&self) -> PathBuf {
        self.data_dir.join("batch_inputs")
    }

    pub fn batch_output_dir(&self) -> PathBuf {
        self.data_dir.join("batch_outputs")
    }

    pub fn tracking_file(&self) -> PathBuf {
        self.data_dir.join("tracking.json")
    }

    pub fn error_logs_dir(&self) -> PathBuf {
        self.data_dir.join("error_logs")
    }

    pub fn chunked_dir(&self) -> PathBuf {
        self.data_dir.join("chunked")
    }

    pub fn unique_tags_file(&self) -> PathBuf {
        self.data_dir.join("unique_tags.yaml")
    }

    pub fn grouped_tags_file(&self) -> PathBuf {
        self.data_dir.join("grouped_tags.yaml")
    }
}

/// Loads and parses the application configuration YAML file.
pub fn load_app_config<P: AsRef<Path>>(config_path: P) -> Result<AppConfig> {
    let path_ref = config_path.as_ref();
    let config_content = fs::read_to_string(path_ref).map_err(|e| {
        PipelineError::ConfigError(format!(
            "Failed to read application config file '{}': {}",
            path_ref.display(),
            e
        ))
    })?;

    let config: AppConfig = serde_yaml::from_str(&config_content).map_err(|e| {
        PipelineError::ConfigError(format!(
            "Failed to parse application config YAML from '{}': {}",
            path_ref.display(),
            e
        ))
    })?;

    config.validate()?;

    Ok(config)
}
