//! Command routing and execution

use crate::catalog;
use crate::cli::args::Commands;
use crate::config::MapReduceConfig;
use crate::mapreduce::MapReduceJob;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Log filter for a `-v` count
pub fn get_log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Execute a CLI command
pub async fn execute_command(command: Commands) -> Result<()> {
    match command {
        Commands::Run {
            input,
            reduce,
            workers,
            config,
        } => {
            let report = run_catalog_job(&input, reduce, workers, config).await?;
            if report.is_empty() {
                println!("No genres found in {}", input.display());
            } else {
                println!("{report}");
            }
            Ok(())
        }
    }
}

/// Run the genre job over a catalog file and render the report
pub async fn run_catalog_job(
    input: &Path,
    reduce: Option<usize>,
    workers: Option<usize>,
    config_path: Option<PathBuf>,
) -> Result<String> {
    let mut config = match config_path {
        Some(path) => MapReduceConfig::load(&path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => MapReduceConfig::default(),
    };
    if let Some(num_reduce) = reduce {
        config.num_reduce = num_reduce;
    }
    if let Some(num_workers) = workers {
        config.num_workers = num_workers;
    }
    debug!("Resolved configuration: {:?}", config);

    let inputs = catalog::load_inputs(input)?;
    info!("Loaded {} records from {}", inputs.len(), input.display());

    let job = MapReduceJob::from_fns(config, catalog::genre_map, catalog::genre_reduce)?;
    let output = job.run(inputs).await.context("MapReduce job failed")?;

    let summaries = catalog::summarize(&output.outputs);
    info!(
        "Job {} produced {} genres in {:?}",
        output.job_id,
        summaries.len(),
        output.duration
    );
    Ok(catalog::format_report(&summaries))
}
