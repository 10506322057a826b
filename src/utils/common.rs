// src/utils/common.rs

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tracing::debug;

use crate::error::Result;

/// Ensure that the provided directories exist, creating them if necessary.
pub fn ensure_directories_exist<P: AsRef<Path>>(directories: &[P]) -> Result<()> {
    for directory in directories {
        let directory = directory.as_ref();
        if !directory.exists() {
            std::fs::create_dir_all(directory)?;
            debug!("Created directory: {}", directory.display());
        }
    }
    Ok(())
}

/// Write `bytes` to `path` via a temporary file in the same directory and a
/// rename, so readers never observe a half-written file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp_path = match path.file_name() {
        Some(name) => {
            let mut tmp_name = name.to_os_string();
            tmp_name.push(".tmp");
            path.with_file_name(tmp_name)
        }
        None => path.with_extension("tmp"),
    };
    std::fs::write(&tmp_path, bytes)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Serialize `data` as pretty JSON and write it atomically.
pub fn save_json<T: Serialize>(data: &T, path: &Path) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(data)?;
    write_atomic(path, &bytes)
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Parse a newline-delimited JSON file into a vector of `T`, skipping blank
/// lines. A line that fails to parse fails the whole read; callers that want
/// per-line tolerance parse the lines themselves.
pub fn load_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = std::fs::read_to_string(path)?;
    let mut items = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        items.push(serde_json::from_str(line)?);
    }
    Ok(items)
}

/// Serialize `items` as one JSON object per line.
pub fn to_jsonl<T: Serialize>(items: &[T]) -> Result<String> {
    let mut out = String::new();
    for item in items {
        out.push_str(&serde_json::to_string(item)?);
        out.push('\n');
    }
    Ok(out)
}
