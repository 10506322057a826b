use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the application configuration YAML file.
    #[arg(short = 'c', long, default_value = "config/app.yaml")]
    pub config: PathBuf,

    /// JSON file mapping day (YYYY-MM-DD) to extracted chat messages.
    #[arg(short = 'i', long)]
    pub input_file: PathBuf,

    /// After generating, split documents above this token count into parts
    /// under the chunked directory.
    #[arg(long)]
    pub max_tokens: Option<usize>,

    /// Pretrained tokenizer used for chunk sizing.
    #[arg(long, default_value = "gpt2")]
    pub tokenizer: String,
}
