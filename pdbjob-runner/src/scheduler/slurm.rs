//! SLURM back-end
//!
//! Pipes the batch script to `sbatch --parsable` and reads back the job id.

use async_trait::async_trait;
use pdbjob_core::SubmissionId;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use super::{BatchScript, Scheduler};
use crate::error::{LaunchError, Result};

/// Submits through `sbatch`
pub struct SlurmScheduler {
    sbatch: PathBuf,
}

impl SlurmScheduler {
    pub fn new(sbatch: PathBuf) -> Self {
        Self { sbatch }
    }
}

#[async_trait]
impl Scheduler for SlurmScheduler {
    fn name(&self) -> &'static str {
        "slurm"
    }

    async fn submit(&self, script: &BatchScript) -> Result<SubmissionId> {
        let program = self.sbatch.display().to_string();
        debug!("Submitting batch script with {}", program);

        let mut child = Command::new(&self.sbatch)
            .arg("--parsable")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| LaunchError::spawn(&program, e))?;

        // sbatch reads the script from stdin when no file is given
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(script.to_string().as_bytes()).await?;
        }

        let output = child.wait_with_output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !stderr.trim().is_empty() {
            debug!("sbatch stderr: {}", stderr.trim());
        }

        if !output.status.success() {
            return Err(LaunchError::Submission {
                scheduler: self.name(),
                status: output.status.code().unwrap_or(-1),
                message: stderr.trim().to_string(),
            });
        }

        let id = parse_job_id(&stdout).ok_or_else(|| LaunchError::Submission {
            scheduler: self.name(),
            status: 0,
            message: format!("unexpected sbatch reply '{}'", stdout.trim()),
        })?;

        info!("Queued SLURM job {}", id);
        Ok(id)
    }
}

/// Reads the job id from an sbatch reply
///
/// Accepts the `--parsable` form (`<id>` or `<id>;<cluster>`) as well as the
/// human form (`Submitted batch job <id>`).
pub fn parse_job_id(reply: &str) -> Option<SubmissionId> {
    let line = reply.lines().map(str::trim).rfind(|line| !line.is_empty())?;
    let line = line.strip_prefix("Submitted batch job ").unwrap_or(line);
    let id = line.split(';').next()?.trim();

    if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit() || c == '_') {
        Some(SubmissionId(id.to_string()))
    } else {
        None
    }
}
