use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "indicator-engine")]
#[command(about = "Background indicator calculation service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the job scheduler in the foreground until interrupted
    Start {
        /// Maximum number of parallel worker processes
        #[arg(short, long)]
        concurrency: Option<usize>,
    },

    /// Calculate all configured indicators for a single security. This is
    /// also the entry point the scheduler spawns per dispatched job.
    Calculate {
        /// Security ID
        #[arg(short, long)]
        security: i64,

        /// Correlation id carried into the worker logs
        #[arg(long)]
        job_id: Option<Uuid>,
    },
}
