//! Token counting and chunking of oversized documents.

use crate::error::{PipelineError, Result};
use crate::markdown::{list_markdown_files, MarkdownDocument};
use crate::utils::common::ensure_directories_exist;
use serde_yaml::Value;
use std::path::Path;
use tokenizers::tokenizer::Tokenizer;
use tracing::{debug, info};

/// Splits documents that exceed a token budget into parts at message
/// boundaries, so no part starts mid-message.
pub struct DocumentChunker {
    tokenizer: Tokenizer,
    token_limit: usize,
}

impl DocumentChunker {
    pub fn new(tokenizer_name: &str, token_limit: usize) -> Result<Self> {
        if token_limit == 0 {
            return Err(PipelineError::ConfigValidationError(
                "DocumentChunker: token_limit must be greater than 0".to_string(),
            ));
        }
        let tokenizer = Tokenizer::from_pretrained(tokenizer_name, None).map_err(|e| {
            PipelineError::Unexpected(format!(
                "Error loading tokenizer '{}': {}",
                tokenizer_name, e
            ))
        })?;
        Ok(DocumentChunker {
            tokenizer,
            token_limit,
        })
    }

    pub fn count_tokens(&self, text: &str) -> Result<usize> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| PipelineError::Unexpected(e.to_string()))?;
        Ok(encoding.get_tokens().len())
    }

    /// Splits a document body into message blocks. A block starts at a line
    /// opening a `**Name**:` message; leading lines before the first message
    /// (the title) stay attached to the first block.
    fn message_blocks(body: &str) -> Vec<String> {
        let mut blocks: Vec<String> = vec![String::new()];
        let mut current_has_message = false;
        for line in body.lines() {
            if line.starts_with("**") {
                if current_has_message {
                    blocks.push(String::new());
                }
                current_has_message = true;
            }
            let current = blocks.last_mut().expect("at least one block");
            current.push_str(line);
            current.push('\n');
        }
        blocks
    }

    /// Splits an oversized document into parts under the token limit, each
    /// keeping the original front-matter plus `part`/`parts` counters.
    /// Documents already under the limit come back as a single untouched
    /// part.
    pub fn chunk_document(&self, document: &MarkdownDocument) -> Result<Vec<MarkdownDocument>> {
        if self.count_tokens(&document.body)? <= self.token_limit {
            return Ok(vec![document.clone()]);
        }

        let blocks = Self::message_blocks(&document.body);
        let mut bodies: Vec<String> = Vec::new();
        let mut current = String::new();
        for block in blocks {
            let candidate_len = self.count_tokens(&current)? + self.count_tokens(&block)?;
            if !current.is_empty() && candidate_len > self.token_limit {
                bodies.push(std::mem::take(&mut current));
            }
            current.push_str(&block);
        }
        if !current.is_empty() {
            bodies.push(current);
        }

        let parts = bodies.len();
        let stem = document
            .file_name
            .strip_suffix(".md")
            .unwrap_or(&document.file_name);

        Ok(bodies
            .into_iter()
            .enumerate()
            .map(|(idx, body)| {
                let mut part = MarkdownDocument::new(format!("{}_part{}.md", stem, idx + 1));
                part.front_matter = document.front_matter.clone();
                part.front_matter.insert(
                    Value::String("part".to_string()),
                    Value::Number((idx as u64 + 1).into()),
                );
                part.front_matter.insert(
                    Value::String("parts".to_string()),
                    Value::Number((parts as u64).into()),
                );
                part.body = body;
                part
            })
            .collect())
    }
}

/// Chunks every oversized document in the markdown directory into the
/// chunked directory. Returns the number of part files written.
pub fn chunk_oversized_files(
    markdown_dir: &Path,
    chunked_dir: &Path,
    chunker: &DocumentChunker,
) -> Result<usize> {
    ensure_directories_exist(&[chunked_dir])?;
    let mut written = 0;
    for path in list_markdown_files(markdown_dir)? {
        let document = MarkdownDocument::load(&path)?;
        let token_count = chunker.count_tokens(&document.body)?;
        if token_count <= chunker.token_limit {
            debug!(file = %document.file_name, token_count, "Under the limit; not chunked");
            continue;
        }
        let parts = chunker.chunk_document(&document)?;
        info!(
            file = %document.file_name,
            token_count,
            parts = parts.len(),
            "Chunked oversized document"
        );
        for part in parts {
            part.save(chunked_dir)?;
            written += 1;
        }
    }
    Ok(written)
}
