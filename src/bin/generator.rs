// src/bin/generator.rs

use anyhow::Context;
use clap::Parser;
use tracing::info;
use ChatScribe::chunk::{chunk_oversized_files, DocumentChunker};
use ChatScribe::config::generator::Args;
use ChatScribe::config::load_app_config;
use ChatScribe::generate::generate_markdown_files;
use ChatScribe::utils::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = load_app_config(&args.config)
        .with_context(|| format!("loading config from {}", args.config.display()))?;
    let _guard = init_logging(&config.error_logs_dir())?;

    info!(input = %args.input_file.display(), "Generating daily markdown documents");
    let written = generate_markdown_files(&config, &args.input_file)?;
    info!(written, "Generation finished");

    if let Some(max_tokens) = args.max_tokens {
        let chunker = DocumentChunker::new(&args.tokenizer, max_tokens)?;
        let parts = chunk_oversized_files(
            &config.markdown_dir(),
            &config.chunked_dir(),
            &chunker,
        )?;
        info!(parts, "Chunking finished");
    }
    Ok(())
}
