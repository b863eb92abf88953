use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "reelprobe")]
#[command(author, version, about = "Video metadata extraction for MP4, MKV and AVI")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe a media file and display its metadata
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Use only the built-in parsers, never ffprobe
        #[arg(long)]
        native_only: bool,
    },

    /// Probe several files and check that their durations agree
    Scan {
        /// Files to probe
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Allowed duration drift in seconds (overrides config)
        #[arg(long)]
        tolerance: Option<f64>,

        /// Maximum files probed at once (overrides config)
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Check that external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
