//! Error types for the launcher

use pdbjob_core::{DefinitionError, EnvironmentSpec};
use thiserror::Error;

/// Result type alias for launcher operations
pub type Result<T> = std::result::Result<T, LaunchError>;

/// Errors that can occur while submitting or running a job
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The job definition failed validation
    #[error("Invalid job definition: {0}")]
    Definition(#[from] DefinitionError),

    /// The runtime environment could not be activated
    #[error("Failed to activate environment {environment}: {reason}")]
    Activation {
        environment: String,
        reason: String,
    },

    /// An external program could not be started
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The scheduler refused the job or replied with something unexpected
    #[error("{scheduler} rejected the job (exit status {status}): {message}")]
    Submission {
        scheduler: &'static str,
        status: i32,
        message: String,
    },

    /// A job run by the local back-end finished unsuccessfully
    #[error("Job {id} finished with exit status {status}, see {log}")]
    JobFailed {
        id: String,
        status: i32,
        log: String,
    },

    /// Inputs required by the tool are missing
    #[error("Preflight checks failed:\n  - {}", .0.join("\n  - "))]
    Preflight(Vec<String>),

    /// The definition could not be embedded in the batch script
    #[error("Failed to encode job definition: {0}")]
    Encode(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LaunchError {
    /// Create an activation error for the given environment
    pub fn activation(environment: &EnvironmentSpec, reason: impl Into<String>) -> Self {
        Self::Activation {
            environment: environment.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a spawn error for the given program
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    /// Check if this error happened while activating the environment
    pub fn is_activation_failure(&self) -> bool {
        matches!(self, Self::Activation { .. })
    }

    /// Exit status of a job that ran and failed, if this error reports one
    pub fn job_status(&self) -> Option<i32> {
        match self {
            Self::JobFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if this error came from the scheduler
    pub fn is_submission_failure(&self) -> bool {
        matches!(self, Self::Submission { .. })
    }
}
