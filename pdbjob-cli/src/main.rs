//! pdbjob CLI
//!
//! Command-line interface for submitting and running h5_to_pdb conversion
//! jobs on a batch scheduler.

mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use pdbjob_runner::{Config, SchedulerKind};
use std::io::IsTerminal;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pdbjob")]
#[command(about = "Batch launcher for MD-to-PDB conversion jobs", long_about = None)]
struct Cli {
    /// Scheduler back-end (slurm or local)
    #[arg(long, global = true, env = "PDBJOB_SCHEDULER")]
    scheduler: Option<SchedulerKind>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdbjob_runner=info,pdbjob_cli=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(scheduler) = cli.scheduler {
        config = config.with_scheduler(scheduler);
    }

    handle_command(cli.command, &config).await
}
