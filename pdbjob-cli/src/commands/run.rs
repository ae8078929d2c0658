//! Run command handler
//!
//! Executes inside the allocation. The transcript echoes to stdout and
//! stderr, which the scheduler captures into the job's log files.

use anyhow::{Context, Result};
use pdbjob_core::JobDefinition;
use pdbjob_runner::{Config, InMemoryTranscript, JobLauncher};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::debug;

use super::load_definition;

/// Run a job to completion and exit with its status
pub async fn handle_run(
    path: Option<&Path>,
    resolved: Option<&Path>,
    config: &Config,
) -> Result<ExitCode> {
    let definition = match resolved {
        Some(resolved) => read_resolved(resolved).await?,
        None => load_definition(path)?,
    };

    let launcher = JobLauncher::from_config(config)?;
    let transcript = InMemoryTranscript::echoing();

    let outcome = launcher.run(&definition, Arc::new(transcript)).await;
    debug!("Job finished: {:?}", outcome);

    Ok(ExitCode::from((outcome.exit_code() & 0xff) as u8))
}

/// Reads the resolved JSON definition from a file or stdin (`-`)
async fn read_resolved(path: &Path) -> Result<JobDefinition> {
    let content = if path.as_os_str() == "-" {
        let mut content = String::new();
        tokio::io::stdin()
            .read_to_string(&mut content)
            .await
            .context("Failed to read job definition from stdin")?;
        content
    } else {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?
    };

    serde_json::from_str(content.trim()).context("Invalid resolved job definition")
}
