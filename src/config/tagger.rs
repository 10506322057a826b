use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Which tag maintenance pass to run.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagTask {
    /// Convert enriched `topics` into sluggified `tags`.
    SlugifyTopics,
    /// Collect the sorted union of tags across all documents.
    Collect,
    /// Group collected tags by their leading segment.
    Group,
    /// Apply cluster names from a batch-result JSONL file to every document.
    Clusters,
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the application configuration YAML file.
    #[arg(short = 'c', long, default_value = "config/app.yaml")]
    pub config: PathBuf,

    /// Tag maintenance pass to run.
    #[arg(short = 't', long, value_enum)]
    pub task: TagTask,

    /// Batch-result JSONL file with tag clusters (required for `clusters`).
    #[arg(long)]
    pub clusters_file: Option<PathBuf>,
}
