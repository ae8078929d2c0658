//! pdbjob runner
//!
//! Submits h5_to_pdb conversion jobs to a batch scheduler and runs them
//! inside their allocation.
//!
//! Architecture:
//! - Configuration: host programs and scheduler back-end from the environment
//! - Scheduler: renders batch scripts and queues them (SLURM or local shell)
//! - Environment: resolves and binds the conda/prefix runtime environment
//! - Invoker: runs the conversion tool and forwards its output
//! - Launcher: ties submission and in-allocation execution together

pub mod config;
pub mod environment;
pub mod error;
pub mod invoker;
pub mod launcher;
pub mod preflight;
pub mod scheduler;
pub mod transcript;

#[cfg(test)]
mod testutil;

pub use config::{Config, SchedulerKind};
pub use environment::{ActivatedEnvironment, EnvironmentActivator, StandardActivator};
pub use error::{LaunchError, Result};
pub use invoker::ToolInvoker;
pub use launcher::{JobLauncher, LaunchOutcome};
pub use scheduler::{BatchScript, Scheduler, scheduler_for};
pub use transcript::{InMemoryTranscript, Transcript};
