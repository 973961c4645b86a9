use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Dub a video: upload, pick the target language, process, download
    Run {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Target language code (see `languages`)
        #[arg(short, long)]
        target: String,

        /// Declared media type, overriding detection from the extension
        #[arg(long)]
        media_type: Option<String>,

        /// Directory for the downloaded video (default: current directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Only print the result link, do not download it
        #[arg(long)]
        no_download: bool,
    },

    /// List supported target languages
    Languages,

    /// Check that the processing backend is reachable
    Check,

    /// Write the default configuration to a file
    Config {
        /// Output TOML file
        #[arg(short, long, default_value = "dubflow.toml")]
        output: PathBuf,
    },
}
