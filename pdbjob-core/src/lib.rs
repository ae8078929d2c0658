//! pdbjob Core
//!
//! Core types for the pdbjob batch launcher.
//!
//! This crate contains:
//! - Domain types: the job definition and everything it is built from
//! - Validation errors raised when a definition is inconsistent

pub mod domain;
pub mod error;

pub use domain::environment::EnvironmentSpec;
pub use domain::invocation::{InvocationSpec, SelectionMode};
pub use domain::job::{
    Completion, CompletionPolicy, JobDefinition, JobDescriptor, SubmissionId, ToolExit, ToolSpec,
};
pub use domain::log::{LogEntry, LogLevel};
pub use error::DefinitionError;
