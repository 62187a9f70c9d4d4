//! CLI command structure using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "docxlab")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Expand a template document against a JSON data file
    Render(RenderArgs),

    /// Show the parts, main document, and text content of a template
    Inspect {
        /// Path to the .docx archive
        template: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
pub struct RenderArgs {
    /// Path to the template .docx
    #[arg(short, long)]
    pub template: PathBuf,

    /// Path to the JSON data binding (object of top-level keys)
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Where to write the generated document
    #[arg(short, long)]
    pub output: PathBuf,

    /// Command delimiters as open,close (e.g. "{,}"); one value is used for
    /// both ends
    #[arg(long)]
    pub delimiters: Option<String>,

    /// Abort on the first command error instead of collecting them
    #[arg(long)]
    pub fail_fast: bool,

    /// Replace typographic quotes inside commands with ASCII ones
    #[arg(long)]
    pub fix_smart_quotes: bool,

    /// Treat null or missing insertion values as errors
    #[arg(long)]
    pub reject_nullish: bool,

    /// Maximum walker iterations before giving up
    #[arg(long)]
    pub max_walk_depth: Option<usize>,
}
