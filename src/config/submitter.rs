// --- Command-Line Arguments Struct ---
// Lives in the library so integration tests can exercise parsing.
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the application configuration YAML file.
    #[arg(short = 'c', long, default_value = "config/app.yaml")]
    pub config: PathBuf,

    /// Submit only these job types (defaults to all four).
    #[arg(short = 'j', long, value_delimiter = ',')]
    pub job_types: Vec<String>,

    /// Build batch input files and tracking entries without calling the
    /// external API (recording client).
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}
