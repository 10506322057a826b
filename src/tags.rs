//! Tag maintenance passes over the enriched markdown directory.

use crate::batch::results::extract_content;
use crate::data_model::{BatchResultLine, TagCluster, TagClusterFile};
use crate::error::Result;
use crate::markdown::{list_markdown_files, MarkdownDocument};
use crate::utils::common::write_atomic;
use crate::utils::text::slugify;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Serialize, Deserialize)]
struct TagsFile {
    tags: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GroupedTagsFile {
    grouped_tags: BTreeMap<String, Vec<String>>,
}

fn front_matter_tags(document: &MarkdownDocument) -> Vec<String> {
    document
        .front_matter_value("tags")
        .and_then(Value::as_sequence)
        .map(|seq| {
            seq.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Replaces the `topics` field with sluggified `tags`. Documents without
/// topics are left alone.
pub fn convert_topics_to_tags(front_matter: &mut serde_yaml::Mapping) {
    let topics_key = Value::String("topics".to_string());
    let topics: Vec<String> = match front_matter.get(&topics_key).and_then(Value::as_sequence) {
        Some(seq) => seq
            .iter()
            .filter_map(Value::as_str)
            .map(slugify)
            .collect(),
        None => return,
    };
    if topics.is_empty() {
        return;
    }
    front_matter.remove(&topics_key);
    front_matter.insert(
        Value::String("tags".to_string()),
        Value::Sequence(topics.into_iter().map(Value::String).collect()),
    );
}

/// Runs `convert_topics_to_tags` over every document in the directory.
pub fn slugify_topics_in_dir(markdown_dir: &Path) -> Result<usize> {
    let mut updated = 0;
    for path in list_markdown_files(markdown_dir)? {
        let mut document = MarkdownDocument::load(&path)?;
        let before = document.front_matter.clone();
        convert_topics_to_tags(&mut document.front_matter);
        if document.front_matter != before {
            document.save(markdown_dir)?;
            info!(file = %document.file_name, "Converted topics to tags");
            updated += 1;
        }
    }
    Ok(updated)
}

/// The deduplicated, sorted union of `tags` across the directory.
pub fn collect_unique_tags(markdown_dir: &Path) -> Result<Vec<String>> {
    let mut all_tags = Vec::new();
    for path in list_markdown_files(markdown_dir)? {
        let document = MarkdownDocument::load(&path)?;
        all_tags.extend(front_matter_tags(&document));
    }
    Ok(all_tags.into_iter().unique().sorted().collect())
}

pub fn save_tags_yaml(tags: Vec<String>, path: &Path) -> Result<()> {
    let rendered = serde_yaml::to_string(&TagsFile { tags })?;
    write_atomic(path, rendered.as_bytes())
}

pub fn load_tags_yaml(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    let file: TagsFile = serde_yaml::from_str(&content)?;
    Ok(file.tags)
}

/// Groups tags by their core term: everything before the first `-`.
pub fn group_tags(tags: &[String]) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for tag in tags {
        let core = tag.split('-').next().unwrap_or(tag).to_string();
        grouped.entry(core).or_default().push(tag.clone());
    }
    grouped
}

pub fn save_grouped_tags(grouped_tags: BTreeMap<String, Vec<String>>, path: &Path) -> Result<()> {
    let rendered = serde_yaml::to_string(&GroupedTagsFile { grouped_tags })?;
    write_atomic(path, rendered.as_bytes())
}

/// Loads tag clusters from a batch-result JSONL file. Lines whose content
/// does not parse as a cluster file are logged and skipped.
pub fn load_tag_clusters(jsonl_path: &Path) -> Result<Vec<TagCluster>> {
    let content = std::fs::read_to_string(jsonl_path)?;
    let mut clusters = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let parsed: Option<TagClusterFile> = serde_json::from_str::<BatchResultLine>(line)
            .ok()
            .and_then(|result_line| extract_content(&result_line).ok())
            .and_then(|content| serde_json::from_value(content).ok());
        match parsed {
            Some(file) => clusters.extend(file.clusters),
            None => warn!(line = idx + 1, "Skipping malformed cluster line"),
        }
    }
    Ok(clusters)
}

/// Extends a document's tags with the sluggified name of every cluster that
/// contains one of its existing tags.
pub fn apply_clusters_to_front_matter(
    front_matter: &mut serde_yaml::Mapping,
    clusters: &[TagCluster],
) {
    let tags_key = Value::String("tags".to_string());
    let existing: Vec<String> = front_matter
        .get(&tags_key)
        .and_then(Value::as_sequence)
        .map(|seq| {
            seq.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    if existing.is_empty() {
        return;
    }

    let mut updated = existing.clone();
    for cluster in clusters {
        let member_present = cluster
            .tags
            .iter()
            .any(|tag| existing.contains(&slugify(tag)));
        if member_present {
            updated.push(slugify(&cluster.cluster_name));
        }
    }

    let updated: Vec<String> = updated.into_iter().unique().collect();
    front_matter.insert(
        tags_key,
        Value::Sequence(updated.into_iter().map(Value::String).collect()),
    );
}

/// Applies cluster names to every document in the directory.
pub fn update_tags_from_clusters(markdown_dir: &Path, clusters: &[TagCluster]) -> Result<usize> {
    let mut updated = 0;
    for path in list_markdown_files(markdown_dir)? {
        let mut document = MarkdownDocument::load(&path)?;
        let before = document.front_matter.clone();
        apply_clusters_to_front_matter(&mut document.front_matter, clusters);
        if document.front_matter != before {
            document.save(markdown_dir)?;
            info!(file = %document.file_name, "Updated tags with cluster names");
            updated += 1;
        }
    }
    Ok(updated)
}
