//! Job launcher
//!
//! Two halves of one job:
//! - `submit` renders the batch script and hands it to the scheduler
//! - `run` executes inside the allocation: activate the environment, invoke
//!   the tool, emit the completion marker
//!
//! `run` is strictly sequential. Activation completes before the tool
//! starts, and the marker is written only after the tool has exited.

use pdbjob_core::{Completion, JobDefinition, JobDescriptor, SubmissionId, ToolExit};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;
use crate::environment::{EnvironmentActivator, StandardActivator};
use crate::error::Result;
use crate::invoker::ToolInvoker;
use crate::scheduler::{BatchScript, Scheduler, scheduler_for};
use crate::transcript::Transcript;

/// How a run inside the allocation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// The definition was invalid; nothing was started
    Rejected { error: String },
    /// The environment could not be activated; the tool was not started
    ActivationFailed { error: String },
    /// The tool ran and the completion marker was emitted
    Finished {
        exit: ToolExit,
        completion: Completion,
    },
}

impl LaunchOutcome {
    /// Process exit code for the allocation
    pub fn exit_code(&self) -> i32 {
        match self {
            LaunchOutcome::Rejected { .. } => 2,
            LaunchOutcome::ActivationFailed { .. } => 1,
            LaunchOutcome::Finished { completion, .. } => completion.exit_code,
        }
    }

    /// Whether the tool process was attempted
    pub fn tool_invoked(&self) -> bool {
        matches!(self, LaunchOutcome::Finished { .. })
    }

    /// The completion marker, if one was emitted
    pub fn marker(&self) -> Option<&str> {
        match self {
            LaunchOutcome::Finished { completion, .. } => Some(&completion.marker),
            _ => None,
        }
    }
}

/// Submits conversion jobs and runs them inside their allocation
pub struct JobLauncher {
    scheduler: Arc<dyn Scheduler>,
    activator: Arc<dyn EnvironmentActivator>,
    invoker: ToolInvoker,
    launcher_exe: PathBuf,
}

impl JobLauncher {
    /// Creates a launcher
    ///
    /// # Arguments
    /// * `scheduler` - Back-end that receives submissions
    /// * `activator` - Binds the runtime environment inside the allocation
    /// * `launcher_exe` - Launcher binary the batch script calls back into
    pub fn new(
        scheduler: Arc<dyn Scheduler>,
        activator: Arc<dyn EnvironmentActivator>,
        launcher_exe: PathBuf,
    ) -> Self {
        Self {
            scheduler,
            activator,
            invoker: ToolInvoker::new(),
            launcher_exe,
        }
    }

    /// Creates a launcher from the host configuration
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        config.validate()?;

        Ok(Self::new(
            scheduler_for(config),
            Arc::new(StandardActivator::new(config.conda_exe.clone())),
            config.launcher_exe()?,
        ))
    }

    /// Name of the scheduler back-end in use
    pub fn scheduler_name(&self) -> &'static str {
        self.scheduler.name()
    }

    /// Validates the definition and renders its batch script
    pub fn render(&self, definition: &JobDefinition) -> Result<BatchScript> {
        definition.validate()?;
        BatchScript::render(definition, &self.launcher_exe)
    }

    /// Queues one job from the current directory
    ///
    /// Every call is an independent submission: the definition is embedded
    /// in the script, and nothing is shared between jobs.
    pub async fn submit(&self, definition: &JobDefinition) -> Result<SubmissionId> {
        let base = std::env::current_dir()?;
        self.submit_from(definition, &base).await
    }

    /// Queues one job, anchoring its working directory at `base`
    ///
    /// The embedded definition always carries an absolute working directory.
    /// The scheduler starts the job there, and the in-allocation run then
    /// resolves the same directory again without moving.
    pub async fn submit_from(
        &self,
        definition: &JobDefinition,
        base: &Path,
    ) -> Result<SubmissionId> {
        let mut definition = definition.clone();
        let working_dir = definition.descriptor.working_dir_from(base);
        definition.descriptor.working_dir = Some(working_dir);

        let script = self.render(&definition)?;
        prepare_log_dirs(&definition.descriptor)?;

        info!(
            "Submitting job '{}' to {} (partition {}, {} CPU(s))",
            definition.descriptor.job_name,
            self.scheduler.name(),
            definition.descriptor.partition,
            definition.descriptor.cpus_per_task
        );

        let id = self.scheduler.submit(&script).await?;
        info!("Job '{}' submitted as {}", definition.descriptor.job_name, id);

        Ok(id)
    }

    /// Runs the job inside its allocation
    ///
    /// Activation failure aborts before the tool starts and emits no marker.
    /// Otherwise the tool runs to completion and the definition's completion
    /// policy decides the marker and exit code.
    pub async fn run(
        &self,
        definition: &JobDefinition,
        transcript: Arc<dyn Transcript>,
    ) -> LaunchOutcome {
        if let Err(e) = definition.validate() {
            transcript.error(format!("Invalid job definition: {}", e));
            return LaunchOutcome::Rejected {
                error: e.to_string(),
            };
        }

        transcript.info(format!("Activating environment {}", definition.environment));

        let environment = match self.activator.activate(&definition.environment).await {
            Ok(environment) => environment,
            Err(e) => {
                transcript.error(e.to_string());
                return LaunchOutcome::ActivationFailed {
                    error: e.to_string(),
                };
            }
        };

        let tool = &definition.tool;
        transcript.info(format!(
            "Running {} {} {}",
            tool.interpreter,
            tool.script.display(),
            definition.invocation.command_line()
        ));

        let exit = self
            .invoker
            .invoke(
                tool,
                &definition.invocation,
                &environment,
                definition.descriptor.working_dir.as_deref(),
                transcript.clone(),
            )
            .await;

        if exit.success() {
            debug!("Tool finished successfully");
        } else {
            transcript.warning(format!(
                "{} exited with status {}",
                script_name(&tool.script),
                exit.status_code()
            ));
        }

        let completion = definition.completion.resolve(exit);
        transcript.info(completion.marker.clone());

        LaunchOutcome::Finished { exit, completion }
    }
}

/// Creates the directories the log patterns point into
///
/// SLURM does not create them and drops the log when they are missing.
/// Directories whose name contains a `%` pattern are left to the scheduler.
fn prepare_log_dirs(descriptor: &JobDescriptor) -> Result<()> {
    let base = descriptor.working_dir.clone().unwrap_or_default();

    for pattern in std::iter::once(&descriptor.output).chain(descriptor.error.iter()) {
        let Some(parent) = Path::new(pattern).parent() else {
            continue;
        };
        if parent.as_os_str().is_empty() || parent.to_string_lossy().contains('%') {
            continue;
        }

        let dir = base.join(parent);
        if !dir.is_dir() {
            debug!("Creating log directory {}", dir.display());
            std::fs::create_dir_all(&dir)?;
        }
    }

    Ok(())
}

fn script_name(script: &Path) -> String {
    script
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| script.display().to_string())
}
