use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "batchpress")]
#[command(author, version, about = "Batch media compression orchestrator")]
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
    /// Discover input files and run the pipeline against them
    Run {
        /// Copy inputs verbatim instead of invoking external tools
        #[arg(long)]
        dry_run: bool,

        /// Override the configured number of concurrent workers
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,
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
