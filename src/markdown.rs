use crate::error::{PipelineError, Result};
use crate::utils::common::write_atomic;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

/// A markdown document with a YAML front-matter block.
///
/// The store guarantees a logical round-trip: parsing a document, rendering
/// it and parsing it again yields an equal front-matter mapping and an
/// unchanged body. Byte-identical formatting of the YAML block is not
/// promised.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkdownDocument {
    /// File name (not path) — this doubles as the batch custom_id.
    pub file_name: String,
    pub front_matter: Mapping,
    pub body: String,
}

impl MarkdownDocument {
    pub fn new(file_name: impl Into<String>) -> Self {
        MarkdownDocument {
            file_name: file_name.into(),
            front_matter: Mapping::new(),
            body: String::new(),
        }
    }

    /// Splits raw file content into front-matter and body.
    ///
    /// A document without a leading `---` line has an empty front-matter
    /// mapping and keeps its full content as the body. A front-matter block
    /// that parses to YAML `null` (e.g. only comments) is treated as empty.
    pub fn parse(file_name: impl Into<String>, content: &str) -> Result<Self> {
        let file_name = file_name.into();

        let Some(rest) = content.strip_prefix("---\n").or_else(|| {
            (content == "---").then_some("")
        }) else {
            return Ok(MarkdownDocument {
                file_name,
                front_matter: Mapping::new(),
                body: content.to_string(),
            });
        };

        // Closing delimiter: a line consisting of exactly `---`.
        let (yaml_part, body_part) = match find_closing_delimiter(rest) {
            Some((yaml, body)) => (yaml, body),
            // Unterminated block: treat the whole file as body rather than
            // guessing where the metadata ends.
            None => {
                return Ok(MarkdownDocument {
                    file_name,
                    front_matter: Mapping::new(),
                    body: content.to_string(),
                })
            }
        };

        let front_matter = if yaml_part.trim().is_empty() {
            Mapping::new()
        } else {
            match serde_yaml::from_str::<Value>(yaml_part)? {
                Value::Mapping(m) => m,
                Value::Null => Mapping::new(),
                other => {
                    return Err(PipelineError::Unexpected(format!(
                        "front-matter of '{}' is not a mapping: {:?}",
                        file_name, other
                    )))
                }
            }
        };

        Ok(MarkdownDocument {
            file_name,
            front_matter,
            body: body_part.trim_start_matches('\n').to_string(),
        })
    }

    /// Renders the document back to file content.
    pub fn render(&self) -> Result<String> {
        let yaml = serde_yaml::to_string(&self.front_matter)?;
        let mut out = String::with_capacity(yaml.len() + self.body.len() + 16);
        out.push_str("---\n");
        out.push_str(&yaml);
        out.push_str("---\n\n");
        out.push_str(&self.body);
        if !out.ends_with('\n') {
            out.push('\n');
        }
        Ok(out)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| PipelineError::DocumentNotFound {
                path: path.display().to_string(),
            })?;
        let content =
            std::fs::read_to_string(path).map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => PipelineError::DocumentNotFound {
                    path: path.display().to_string(),
                },
                _ => PipelineError::IoError { source: e },
            })?;
        Self::parse(file_name, &content)
    }

    /// Writes the document to `dir/<file_name>` atomically, only ever
    /// rewriting the front-matter block around the untouched body.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let rendered = self.render()?;
        write_atomic(&dir.join(&self.file_name), rendered.as_bytes())
    }

    /// Convenience accessor for a front-matter value by key.
    pub fn front_matter_value(&self, key: &str) -> Option<&Value> {
        self.front_matter.get(Value::String(key.to_string()))
    }
}

fn find_closing_delimiter(rest: &str) -> Option<(&str, &str)> {
    if rest.starts_with("---\n") {
        // Empty front-matter block.
        return Some(("", &rest[4..]));
    }
    if rest == "---" {
        return Some(("", ""));
    }
    let idx = rest.find("\n---\n").map(|i| (i, i + 5));
    let idx = idx.or_else(|| rest.ends_with("\n---").then(|| (rest.len() - 4, rest.len())));
    idx.map(|(yaml_end, body_start)| (&rest[..yaml_end + 1], &rest[body_start..]))
}

/// Lists the `.md` files directly inside `dir`, sorted by file name so runs
/// are deterministic.
pub fn list_markdown_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("md") && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
