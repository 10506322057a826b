// Utils

pub mod common;
pub mod logging;
pub mod text;

pub use text::{clean_conversation, format_as_quote, slugify};
