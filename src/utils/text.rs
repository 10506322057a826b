// Text utils

use once_cell::sync::Lazy;
use regex::Regex;

static FRONT_MATTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\A---\n.*?\n---\n?").expect("front-matter regex"));

/// Rendered timestamps, e.g. `08:15 AM`.
static TIMESTAMP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{2}:\d{2} [AP]M").expect("timestamp regex"));

static SLUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\W_]+").expect("slug regex"));

/// Strips the front-matter block and timestamp markers from a rendered
/// document, leaving just the conversation text sent to the model.
pub fn clean_conversation(document: &str) -> String {
    let without_front_matter = FRONT_MATTER_RE.replace(document, "");
    let without_timestamps = TIMESTAMP_RE.replace_all(&without_front_matter, "");
    without_timestamps
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Convert text into a slug (URL-friendly string).
pub fn slugify(text: &str) -> String {
    SLUG_RE
        .replace_all(&text.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

/// Formats a multi-line message as a quoted block.
pub fn format_as_quote(message_text: &str) -> String {
    message_text
        .lines()
        .map(|line| format!("> {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}
