//! CLI argument structures

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Run MapReduce jobs on an in-process worker pool
#[derive(Parser)]
#[command(name = "mapreduce-engine")]
#[command(about = "mapreduce-engine - In-process MapReduce coordinator and workers", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute per-genre statistics over an anime catalog
    #[command(name = "run")]
    Run {
        /// JSON file holding an array of `{name, rating, genres}` records
        #[arg(short = 'i', long)]
        input: PathBuf,

        /// Number of reduce partitions (overrides the config file)
        #[arg(short = 'r', long)]
        reduce: Option<usize>,

        /// Number of workers (overrides the config file)
        #[arg(short = 'w', long)]
        workers: Option<usize>,

        /// Path to a YAML, TOML or JSON configuration file
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,
    },
}
