//! Scheduler layer
//!
//! A scheduler accepts a rendered batch script and queues it. The launcher
//! never observes the job after that point; the scheduler owns allocation,
//! execution and cancellation.

mod local;
mod script;
mod slurm;

pub use local::LocalScheduler;
pub use script::{BatchScript, DEFINITION_DELIMITER, shell_quote};
pub use slurm::{SlurmScheduler, parse_job_id};

use async_trait::async_trait;
use pdbjob_core::SubmissionId;
use std::sync::Arc;

use crate::config::{Config, SchedulerKind};
use crate::error::Result;

/// Back-end that queues batch scripts
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Short name used in logs and errors
    fn name(&self) -> &'static str;

    /// Queues the script and returns the scheduler's job id
    async fn submit(&self, script: &BatchScript) -> Result<SubmissionId>;
}

/// Builds the scheduler back-end selected in the configuration
pub fn scheduler_for(config: &Config) -> Arc<dyn Scheduler> {
    match config.scheduler {
        SchedulerKind::Slurm => Arc::new(SlurmScheduler::new(config.sbatch.clone())),
        SchedulerKind::Local => Arc::new(LocalScheduler::new(config.shell.clone())),
    }
}
