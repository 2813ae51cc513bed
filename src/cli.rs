use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "discforge")]
#[command(author, version, about = "Media descriptors for remote Blu-ray/DVD images")]
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
    /// Run one scan pass over the library
    Scan {
        /// Library root (defaults to scan.root from the config)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Maximum placeholders to process
        #[arg(long)]
        batch: Option<usize>,
    },

    /// Generate the descriptor for a single placeholder
    Process {
        #[arg(required = true)]
        placeholder: PathBuf,
    },

    /// Probe an image (or the image a placeholder points at) and display it
    Probe {
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or reset the failure cache
    Failures {
        #[command(subcommand)]
        command: FailuresCommand,
    },

    /// Upload artifacts to remote storage
    Upload {
        #[command(subcommand)]
        command: UploadCommand,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

#[derive(Subcommand)]
pub enum FailuresCommand {
    /// List every recorded failure
    List,
    /// Show failure totals
    Stats,
    /// Forget the failures of one placeholder
    Reset { path: PathBuf },
    /// Forget all failures
    Clear,
}

#[derive(Subcommand)]
pub enum UploadCommand {
    /// Upload one artifact
    File { path: PathBuf },
    /// Upload every artifact under a root that is not uploaded yet
    All {
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Retry failed uploads
    Retry,
    /// Show upload totals
    Stats,
    /// Forget the upload record of one artifact
    Reset { path: PathBuf },
}
