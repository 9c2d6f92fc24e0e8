use clap::Parser;
use mapreduce_engine::cli::{execute_command, get_log_level, Cli};
use tracing::{debug, error, trace};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(get_log_level(cli.verbose))
        .with_target(cli.verbose >= 2)
        .with_thread_ids(cli.verbose >= 2)
        .init();

    debug!(
        "mapreduce-engine started with verbosity level: {}",
        cli.verbose
    );
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    if let Err(e) = execute_command(cli.command).await {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
