use std::path::PathBuf;

use engine::request::{DEFAULT_MODEL, DEFAULT_OUT_DIR, DEFAULT_QUALITY, DEFAULT_SIZE};

#[derive(Debug, clap::Parser)]
#[command(
    name = "imagegen",
    about = "OpenAI image generation CLI for single prompts and JSONL batches",
    after_help = "Exit codes:\n  \
        0  success\n  \
        1  missing OPENAI_API_KEY, unreadable job source, or bad usage\n  \
        2  batch completed with at least one failed line\n  \
        3  single-prompt generation failed"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Generate one image from a prompt
    Generate(Generate),
    /// Process a JSONL file, one generation job per line
    Batch(Batch),
}

/// Request fields shared by both modes; per-job values override them.
#[derive(Debug, clap::Args)]
pub struct Shared {
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,

    #[arg(long, default_value = DEFAULT_SIZE)]
    pub size: String,

    #[arg(long, default_value = DEFAULT_QUALITY)]
    pub quality: String,

    /// Omitted from the request when not given
    #[arg(long)]
    pub background: Option<String>,
}

#[derive(Debug, clap::Args)]
pub struct Generate {
    #[arg(long)]
    pub prompt: String,

    /// Exact output path; overrides --out-dir and --name
    #[arg(long)]
    pub out: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_OUT_DIR)]
    pub out_dir: PathBuf,

    /// Base name for the output file; defaults to a slug of the prompt
    #[arg(long)]
    pub name: Option<String>,

    #[command(flatten)]
    pub shared: Shared,
}

#[derive(Debug, clap::Args)]
pub struct Batch {
    /// Job source, one JSON object per line
    #[arg(long)]
    pub jsonl: PathBuf,

    #[arg(long, default_value = DEFAULT_OUT_DIR)]
    pub out_dir: PathBuf,

    #[command(flatten)]
    pub shared: Shared,
}
