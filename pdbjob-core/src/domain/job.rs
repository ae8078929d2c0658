//! Job domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::domain::environment::EnvironmentSpec;
use crate::domain::invocation::InvocationSpec;
use crate::error::DefinitionError;

/// Scheduler directives for one job
///
/// Read by the scheduler only; the launcher never acts on them itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub job_name: String,
    pub partition: String,
    /// Log path pattern, `%j` expands to the job id
    pub output: String,
    #[serde(default)]
    pub error: Option<String>,
    pub nodes: u32,
    pub tasks_per_node: u32,
    pub cpus_per_task: u32,
    /// Wall-clock limit in the scheduler's own format, e.g. `24:00:00`
    #[serde(default)]
    pub time_limit: Option<String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

impl Default for JobDescriptor {
    fn default() -> Self {
        Self {
            job_name: "h5_to_pdb".to_string(),
            partition: "cpu".to_string(),
            output: "logs/h5_to_pdb_%j.out".to_string(),
            error: None,
            nodes: 1,
            tasks_per_node: 1,
            cpus_per_task: 8,
            time_limit: None,
            working_dir: None,
        }
    }
}

impl JobDescriptor {
    /// Expands `%j` in the output pattern
    pub fn output_for(&self, job_id: &str) -> String {
        self.output.replace("%j", job_id)
    }

    /// Working directory resolved against `base`
    ///
    /// A relative directory is taken relative to `base`; without one the
    /// job runs in `base` itself.
    pub fn working_dir_from(&self, base: &Path) -> PathBuf {
        match &self.working_dir {
            Some(dir) => base.join(dir),
            None => base.to_path_buf(),
        }
    }

    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.job_name.trim().is_empty() {
            return Err(DefinitionError::EmptyField("job_name"));
        }
        if self.partition.trim().is_empty() {
            return Err(DefinitionError::EmptyField("partition"));
        }
        if self.output.trim().is_empty() {
            return Err(DefinitionError::EmptyField("output"));
        }

        let text_fields = [
            ("job_name", Some(self.job_name.as_str())),
            ("partition", Some(self.partition.as_str())),
            ("output", Some(self.output.as_str())),
            ("error", self.error.as_deref()),
            ("time_limit", self.time_limit.as_deref()),
        ];
        for (name, value) in text_fields {
            if value.is_some_and(|v| v.contains('\n') || v.contains('\r')) {
                return Err(DefinitionError::MultilineValue(name));
            }
        }
        if let Some(dir) = &self.working_dir {
            let dir = dir.to_string_lossy();
            if dir.contains('\n') || dir.contains('\r') {
                return Err(DefinitionError::MultilineValue("working_dir"));
            }
        }

        if self.nodes == 0 {
            return Err(DefinitionError::ZeroResource("nodes"));
        }
        if self.tasks_per_node == 0 {
            return Err(DefinitionError::ZeroResource("tasks_per_node"));
        }
        if self.cpus_per_task == 0 {
            return Err(DefinitionError::ZeroResource("cpus_per_task"));
        }
        Ok(())
    }
}

/// The external program and the interpreter that runs it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub interpreter: String,
    pub script: PathBuf,
}

impl Default for ToolSpec {
    fn default() -> Self {
        Self {
            interpreter: "python".to_string(),
            script: PathBuf::from("src/data/processing/h5_to_pdb.py"),
        }
    }
}

/// How the final status line and exit code are chosen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionPolicy {
    /// `Done` only when the tool exits 0, otherwise a failure marker and its status
    #[default]
    Strict,
    /// Always `Done` and exit 0 once the tool has returned
    Unconditional,
}

impl CompletionPolicy {
    pub const DONE: &'static str = "Done";

    /// Picks the completion marker and process exit code for a tool result
    pub fn resolve(self, exit: ToolExit) -> Completion {
        match self {
            CompletionPolicy::Unconditional => Completion {
                marker: Self::DONE.to_string(),
                exit_code: 0,
            },
            CompletionPolicy::Strict if exit.success() => Completion {
                marker: Self::DONE.to_string(),
                exit_code: 0,
            },
            CompletionPolicy::Strict => Completion {
                marker: format!("Failed (exit status {})", exit.status_code()),
                exit_code: exit.status_code(),
            },
        }
    }
}

impl fmt::Display for CompletionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionPolicy::Strict => write!(f, "strict"),
            CompletionPolicy::Unconditional => write!(f, "unconditional"),
        }
    }
}

impl FromStr for CompletionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(CompletionPolicy::Strict),
            "unconditional" => Ok(CompletionPolicy::Unconditional),
            other => Err(format!(
                "unknown completion policy '{}', expected 'strict' or 'unconditional'",
                other
            )),
        }
    }
}

/// How the tool process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolExit {
    /// Normal exit with a status code
    Exited(i32),
    /// Killed by the given signal
    Signaled(i32),
    /// The interpreter could not be started at all
    SpawnFailed,
}

impl ToolExit {
    pub fn success(self) -> bool {
        matches!(self, ToolExit::Exited(0))
    }

    /// Status as a shell would report it
    pub fn status_code(self) -> i32 {
        match self {
            ToolExit::Exited(code) => code,
            ToolExit::Signaled(signal) => 128 + signal,
            ToolExit::SpawnFailed => 127,
        }
    }
}

/// Final marker line and process exit code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub marker: String,
    pub exit_code: i32,
}

/// Identifier returned by a scheduler when a job is queued
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionId(pub String);

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything needed to queue and run one conversion job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDefinition {
    #[serde(default)]
    pub descriptor: JobDescriptor,
    #[serde(default)]
    pub environment: EnvironmentSpec,
    #[serde(default)]
    pub tool: ToolSpec,
    #[serde(default)]
    pub invocation: InvocationSpec,
    #[serde(default)]
    pub completion: CompletionPolicy,
}

impl JobDefinition {
    pub fn validate(&self) -> Result<(), DefinitionError> {
        self.descriptor.validate()?;

        if self.tool.interpreter.trim().is_empty() {
            return Err(DefinitionError::EmptyField("interpreter"));
        }
        if self.tool.script.as_os_str().is_empty() {
            return Err(DefinitionError::EmptyField("script"));
        }
        if let EnvironmentSpec::Conda { name } = &self.environment {
            if name.trim().is_empty() {
                return Err(DefinitionError::EmptyField("environment"));
            }
        }

        self.invocation.validate()
    }
}
