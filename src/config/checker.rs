use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the application configuration YAML file.
    #[arg(short = 'c', long, default_value = "config/app.yaml")]
    pub config: PathBuf,

    /// Poll with the recording client instead of the live API.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}
