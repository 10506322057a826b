//! Mapping batch result bundles back onto markdown documents.

use crate::data_model::{BatchResultLine, JobType};
use crate::error::{PipelineError, Result};
use crate::markdown::MarkdownDocument;
use crate::merge::merge_fields;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use serde_yaml::Mapping;
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Models occasionally wrap their JSON reply in markdown code fences.
static FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```(?:json)?").expect("fence regex"));

/// Parses the raw bundle into result lines. Lines that do not match the
/// expected envelope are logged and skipped so one bad line cannot poison
/// the rest of the bundle.
pub fn parse_result_lines(content: &str) -> Vec<BatchResultLine> {
    let mut lines = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<BatchResultLine>(line) {
            Ok(parsed) => lines.push(parsed),
            Err(e) => {
                warn!(line = idx + 1, error = %e, "Skipping malformed result line");
            }
        }
    }
    lines
}

/// Extracts the structured JSON payload from a result line's first choice.
pub fn extract_content(line: &BatchResultLine) -> Result<serde_json::Value> {
    let choice =
        line.response
            .body
            .choices
            .first()
            .ok_or_else(|| PipelineError::MalformedResult {
                custom_id: line.custom_id.clone(),
                reason: "result contains no choices".to_string(),
            })?;
    let raw = FENCE_RE.replace_all(&choice.message.content, "");
    serde_json::from_str(raw.trim()).map_err(|e| PipelineError::MalformedResult {
        custom_id: line.custom_id.clone(),
        reason: format!("content is not valid JSON: {}", e),
    })
}

/// Builds the front-matter fields a job type's result contributes.
///
/// Missing keys in the model's reply degrade to empty values rather than
/// failing, matching the merge engine's forgiving contract.
pub fn front_matter_payload(job_type: JobType, content: &serde_json::Value) -> Result<Mapping> {
    let value = match job_type {
        JobType::Topics | JobType::Entities | JobType::KeyPoints => content
            .get(job_type.result_key())
            .cloned()
            .unwrap_or_else(|| json!([])),
        JobType::Sentiment => json!({
            "sentiment": content.get("sentiment").cloned().unwrap_or_else(|| json!("Unknown")),
            "polarity": content.get("polarity").cloned().unwrap_or_else(|| json!(0)),
            "subjectivity": content.get("subjectivity").cloned().unwrap_or_else(|| json!(0)),
        }),
    };

    let mut payload = Mapping::new();
    payload.insert(
        serde_yaml::Value::String(job_type.front_matter_key().to_string()),
        serde_yaml::to_value(&value)?,
    );
    Ok(payload)
}

/// Counters for one bundle application pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BundleStats {
    pub updated: usize,
    pub skipped: usize,
}

/// Applies one result line to its document: resolve by custom_id, merge the
/// mapped fields into the front-matter, write back with the body untouched.
pub fn apply_result_line(
    markdown_dir: &Path,
    job_type: JobType,
    line: &BatchResultLine,
) -> Result<()> {
    let doc_path = markdown_dir.join(&line.custom_id);
    let mut document = MarkdownDocument::load(&doc_path)?;

    let content = extract_content(line)?;
    let payload = front_matter_payload(job_type, &content)?;
    debug!(custom_id = %line.custom_id, job_type = %job_type, "Merging result payload");
    merge_fields(&mut document.front_matter, payload);

    document.save(markdown_dir)?;
    Ok(())
}

/// Applies a whole bundle, isolating per-document failures: a missing
/// document or malformed payload is logged and skipped while the remaining
/// lines are still applied.
pub fn apply_bundle(
    markdown_dir: &Path,
    job_type: JobType,
    lines: &[BatchResultLine],
) -> BundleStats {
    let mut stats = BundleStats::default();
    for line in lines {
        match apply_result_line(markdown_dir, job_type, line) {
            Ok(()) => {
                info!(custom_id = %line.custom_id, job_type = %job_type, "Updated document");
                stats.updated += 1;
            }
            Err(e) => {
                error!(custom_id = %line.custom_id, job_type = %job_type, error = %e, "Skipping result line");
                stats.skipped += 1;
            }
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Value;

    fn result_line(custom_id: &str, content: &str) -> BatchResultLine {
        let raw = json!({
            "custom_id": custom_id,
            "response": {
                "body": {
                    "choices": [{"message": {"content": content}}]
                }
            }
        });
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn test_extract_content_plain_json() {
        let line = result_line("a.md", r#"{"topics": ["family"]}"#);
        let content = extract_content(&line).unwrap();
        assert_eq!(content["topics"][0], "family");
    }

    #[test]
    fn test_extract_content_fenced_json() {
        let line = result_line("a.md", "```json\n{\"topics\": [\"family\"]}\n```");
        let content = extract_content(&line).unwrap();
        assert_eq!(content["topics"][0], "family");
    }

    #[test]
    fn test_extract_content_rejects_non_json() {
        let line = result_line("a.md", "sorry, I cannot do that");
        let err = extract_content(&line).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedResult { .. }));
    }

    #[test]
    fn test_extract_content_rejects_empty_choices() {
        let raw = json!({
            "custom_id": "a.md",
            "response": {"body": {"choices": []}}
        });
        let line: BatchResultLine = serde_json::from_value(raw).unwrap();
        assert!(matches!(
            extract_content(&line),
            Err(PipelineError::MalformedResult { .. })
        ));
    }

    #[test]
    fn test_front_matter_payload_field_mapping() {
        let content = json!({"entities": [{"person": "Jason", "role": "father", "relationships": []}]});
        let payload = front_matter_payload(JobType::Entities, &content).unwrap();
        assert!(payload.contains_key(Value::String("entity_relationships".into())));

        let content = json!({"key_points": ["point one"]});
        let payload = front_matter_payload(JobType::KeyPoints, &content).unwrap();
        assert!(payload.contains_key(Value::String("detailed_summary".into())));
    }

    #[test]
    fn test_front_matter_payload_sentiment_defaults() {
        let payload = front_matter_payload(JobType::Sentiment, &json!({})).unwrap();
        let sentiment = payload
            .get(Value::String("overall_sentiment".into()))
            .and_then(|v| v.as_mapping())
            .unwrap();
        assert_eq!(
            sentiment.get(Value::String("sentiment".into())),
            Some(&Value::String("Unknown".into()))
        );
    }

    #[test]
    fn test_parse_result_lines_skips_malformed() {
        let content = format!(
            "{}\nnot json at all\n{}\n",
            serde_json::to_string(&json!({
                "custom_id": "a.md",
                "response": {"body": {"choices": [{"message": {"content": "{}"}}]}}
            }))
            .unwrap(),
            serde_json::to_string(&json!({
                "custom_id": "b.md",
                "response": {"body": {"choices": [{"message": {"content": "{}"}}]}}
            }))
            .unwrap()
        );
        let lines = parse_result_lines(&content);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].custom_id, "a.md");
        assert_eq!(lines[1].custom_id, "b.md");
    }

    #[test]
    fn test_apply_bundle_skips_missing_document_and_updates_rest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("present.md"),
            "---\ntopics:\n---\n\nbody text\n",
        )
        .unwrap();

        let lines = vec![
            result_line("missing.md", r#"{"topics": ["lost"]}"#),
            result_line("present.md", r#"{"topics": ["family"]}"#),
        ];
        let stats = apply_bundle(dir.path(), JobType::Topics, &lines);
        assert_eq!(stats, BundleStats { updated: 1, skipped: 1 });

        let doc = MarkdownDocument::load(&dir.path().join("present.md")).unwrap();
        assert_eq!(
            doc.front_matter_value("topics"),
            Some(&serde_yaml::from_str("[family]").unwrap())
        );
        assert_eq!(doc.body, "body text\n");
    }

    #[test]
    fn test_apply_is_idempotent_on_rerun() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("d.md"), "---\ntags: [b]\n---\n\nbody\n").unwrap();

        let lines = vec![result_line("d.md", r#"{"topics": ["a", "b"]}"#)];
        apply_bundle(dir.path(), JobType::Topics, &lines);
        let first = MarkdownDocument::load(&dir.path().join("d.md")).unwrap();
        apply_bundle(dir.path(), JobType::Topics, &lines);
        let second = MarkdownDocument::load(&dir.path().join("d.md")).unwrap();
        assert_eq!(first, second);
    }
}
