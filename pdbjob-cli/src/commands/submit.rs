//! Submit command handler

use anyhow::{Context, Result};
use colored::*;
use pdbjob_core::JobDefinition;
use pdbjob_runner::{Config, JobLauncher, LaunchError, preflight};
use std::path::Path;
use std::process::ExitCode;

use super::load_definition;

/// Submit one conversion job
///
/// The job runs from the submit directory unless the definition names a
/// working directory; a relative one is taken relative to the submit
/// directory, so paths mean the same thing on both sides.
pub async fn handle_submit(
    path: Option<&Path>,
    dry_run: bool,
    no_preflight: bool,
    config: &Config,
) -> Result<ExitCode> {
    let mut definition = load_definition(path)?;
    let submit_dir = std::env::current_dir().context("Failed to determine current directory")?;
    definition.descriptor.working_dir = Some(definition.descriptor.working_dir_from(&submit_dir));

    let launcher = JobLauncher::from_config(config)?;

    if dry_run {
        let script = launcher.render(&definition)?;
        print!("{}", script);
        return Ok(ExitCode::SUCCESS);
    }

    if !no_preflight {
        preflight::check(&definition)?;
    }

    match launcher.submit_from(&definition, &submit_dir).await {
        Ok(id) => {
            println!("Submitted batch job {}", id.to_string().green().bold());
            print_log_hint(&definition, &id.0);
            Ok(ExitCode::SUCCESS)
        }
        Err(LaunchError::JobFailed { id, status, log }) => {
            eprintln!(
                "{} Job {} failed (exit status {})",
                "✗".red().bold(),
                id,
                status
            );
            eprintln!("  {} {}", "Log:".dimmed(), log.cyan());
            Ok(ExitCode::from((status & 0xff) as u8))
        }
        Err(e) if e.is_submission_failure() => {
            eprintln!("{} {}", "✗".red().bold(), e);
            eprintln!(
                "  {} partition '{}' on scheduler '{}'",
                "Check".dimmed(),
                definition.descriptor.partition,
                launcher.scheduler_name()
            );
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}

fn print_log_hint(definition: &JobDefinition, job_id: &str) {
    let descriptor = &definition.descriptor;
    let log = match &descriptor.working_dir {
        Some(dir) => dir.join(descriptor.output_for(job_id)),
        None => descriptor.output_for(job_id).into(),
    };
    println!(
        "  {} {}",
        "Log:".dimmed(),
        log.display().to_string().cyan()
    );
}
