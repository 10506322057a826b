// src/bin/tagger.rs

use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;
use ChatScribe::config::load_app_config;
use ChatScribe::config::tagger::{Args, TagTask};
use ChatScribe::tags;
use ChatScribe::utils::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = load_app_config(&args.config)
        .with_context(|| format!("loading config from {}", args.config.display()))?;
    let _guard = init_logging(&config.error_logs_dir())?;

    let markdown_dir = config.markdown_dir();
    match args.task {
        TagTask::SlugifyTopics => {
            let updated = tags::slugify_topics_in_dir(&markdown_dir)?;
            info!(updated, "Converted topics to tags");
        }
        TagTask::Collect => {
            let unique = tags::collect_unique_tags(&markdown_dir)?;
            info!(count = unique.len(), "Collected unique tags");
            tags::save_tags_yaml(unique, &config.unique_tags_file())?;
            info!(path = %config.unique_tags_file().display(), "Saved unique tags");
        }
        TagTask::Group => {
            let unique = tags::load_tags_yaml(&config.unique_tags_file())?;
            let grouped = tags::group_tags(&unique);
            info!(groups = grouped.len(), "Grouped tags by core term");
            tags::save_grouped_tags(grouped, &config.grouped_tags_file())?;
            info!(path = %config.grouped_tags_file().display(), "Saved grouped tags");
        }
        TagTask::Clusters => {
            let Some(clusters_file) = &args.clusters_file else {
                bail!("--clusters-file is required for the clusters task");
            };
            let clusters = tags::load_tag_clusters(clusters_file)?;
            info!(clusters = clusters.len(), "Loaded tag clusters");
            let updated = tags::update_tags_from_clusters(&markdown_dir, &clusters)?;
            info!(updated, "Applied cluster names to documents");
        }
    }
    Ok(())
}
