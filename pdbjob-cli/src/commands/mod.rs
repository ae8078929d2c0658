//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod init;
mod run;
mod submit;
mod validate;

use anyhow::{Context, Result};
use clap::Subcommand;
use pdbjob_core::JobDefinition;
use pdbjob_runner::Config;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Submit a conversion job to the scheduler
    Submit {
        /// Job definition (.lua or .json); built-in defaults when omitted
        definition: Option<PathBuf>,

        /// Print the batch script instead of submitting it
        #[arg(long)]
        dry_run: bool,

        /// Skip the input file checks
        #[arg(long)]
        no_preflight: bool,
    },
    /// Run a job inside its allocation (called from the batch script)
    Run {
        /// Job definition (.lua or .json); built-in defaults when omitted
        #[arg(conflicts_with = "resolved")]
        definition: Option<PathBuf>,

        /// Resolved JSON definition, or `-` to read it from stdin
        #[arg(long, value_name = "FILE")]
        resolved: Option<PathBuf>,
    },
    /// Check a job definition and its input files
    Validate {
        /// Job definition (.lua or .json); built-in defaults when omitted
        definition: Option<PathBuf>,
    },
    /// Write a starter job definition and Lua editor support files
    Init {
        /// Output directory for generated files
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Overwrite an existing job.lua
        #[arg(long)]
        force: bool,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The launcher configuration
///
/// # Returns
/// The process exit code
pub async fn handle_command(command: Commands, config: &Config) -> Result<ExitCode> {
    match command {
        Commands::Submit {
            definition,
            dry_run,
            no_preflight,
        } => submit::handle_submit(definition.as_deref(), dry_run, no_preflight, config).await,
        Commands::Run {
            definition,
            resolved,
        } => run::handle_run(definition.as_deref(), resolved.as_deref(), config).await,
        Commands::Validate { definition } => validate::handle_validate(definition.as_deref()),
        Commands::Init { output, force } => init::handle_init(&output, force),
    }
}

/// Load a job definition from disk
///
/// `.json` files are read as a resolved definition; anything else is
/// evaluated as Lua. Without a path the built-in defaults are used.
pub fn load_definition(path: Option<&Path>) -> Result<JobDefinition> {
    let Some(path) = path else {
        return Ok(JobDefinition::default());
    };

    if path.extension().is_some_and(|ext| ext == "json") {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        return serde_json::from_str(&content)
            .with_context(|| format!("Invalid job definition in {}", path.display()));
    }

    pdbjob_lua::load_job_definition(path)
}
