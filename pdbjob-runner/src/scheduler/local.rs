//! Local back-end
//!
//! Runs the batch script on this machine for hosts without a cluster. The
//! `#SBATCH` lines are plain comments to the shell; the output pattern is
//! honoured by redirecting the script's streams into the expanded log path.

use async_trait::async_trait;
use pdbjob_core::SubmissionId;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};
use uuid::Uuid;

use super::{BatchScript, Scheduler};
use crate::error::{LaunchError, Result};
use crate::invoker::tool_exit;

/// Runs batch scripts to completion with a local shell
pub struct LocalScheduler {
    shell: PathBuf,
}

impl LocalScheduler {
    pub fn new(shell: PathBuf) -> Self {
        Self { shell }
    }

    /// Opens a log file, creating its directory
    fn open_log(path: &Path) -> Result<File> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(File::create(path)?)
    }
}

#[async_trait]
impl Scheduler for LocalScheduler {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn submit(&self, script: &BatchScript) -> Result<SubmissionId> {
        let simple = Uuid::new_v4().simple().to_string();
        let id = SubmissionId(format!("local-{}", &simple[..8]));

        let base = script.working_dir.clone().unwrap_or_default();
        let output_path = base.join(script.output.replace("%j", &id.0));
        let stdout = Self::open_log(&output_path)?;
        let stderr = match &script.error {
            Some(pattern) => Self::open_log(&base.join(pattern.replace("%j", &id.0)))?,
            None => stdout.try_clone()?,
        };

        info!("Running job {} locally, log at {}", id, output_path.display());

        let mut command = Command::new(&self.shell);
        command
            .arg("-s")
            .stdin(Stdio::piped())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));
        if let Some(dir) = &script.working_dir {
            command.current_dir(dir);
        }

        let mut child = command
            .spawn()
            .map_err(|e| LaunchError::spawn(self.shell.display().to_string(), e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(script.to_string().as_bytes()).await?;
        }

        let status = tool_exit(child.wait().await?);
        if !status.success() {
            warn!("Local job {} finished with exit status {}", id, status.status_code());
            return Err(LaunchError::JobFailed {
                id: id.0,
                status: status.status_code(),
                log: output_path.display().to_string(),
            });
        }

        Ok(id)
    }
}
