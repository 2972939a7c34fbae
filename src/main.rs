use anyhow::Result;
use clap::Parser;
use indicator_engine::cli::{Cli, Commands};
use indicator_engine::processor::scheduler::start_scheduler;
use indicator_engine::worker::run_calculation;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start { concurrency } => start_scheduler(concurrency).await?,
        Commands::Calculate { security, job_id } => run_calculation(security, job_id).await?,
    }

    Ok(())
}
