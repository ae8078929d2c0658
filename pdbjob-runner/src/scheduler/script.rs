//! Batch script rendering
//!
//! The script carries the scheduler directives as `#SBATCH` comment lines
//! and a body that calls back into the launcher with the resolved job
//! definition embedded as JSON. Queued jobs therefore do not depend on the
//! definition file staying unchanged after submission.

use pdbjob_core::JobDefinition;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Here-document delimiter around the embedded definition
pub const DEFINITION_DELIMITER: &str = "PDBJOB_DEFINITION";

/// A rendered batch script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchScript {
    /// `#SBATCH` options, without the prefix
    pub directives: Vec<String>,
    /// Shell commands run inside the allocation
    pub body: String,
    /// Output log pattern, `%j` expands to the job id
    pub output: String,
    /// Error log pattern, if separate from the output
    pub error: Option<String>,
    /// Directory the job runs in
    pub working_dir: Option<PathBuf>,
}

impl BatchScript {
    /// Renders the script for a definition
    ///
    /// # Arguments
    /// * `definition` - The job to run; validated by the caller
    /// * `launcher_exe` - Absolute path of the launcher binary on the compute node
    pub fn render(definition: &JobDefinition, launcher_exe: &Path) -> Result<Self> {
        let descriptor = &definition.descriptor;

        let mut directives = vec![
            format!("--job-name={}", descriptor.job_name),
            format!("--partition={}", descriptor.partition),
            format!("--output={}", descriptor.output),
        ];
        if let Some(error) = &descriptor.error {
            directives.push(format!("--error={}", error));
        }
        directives.push(format!("--nodes={}", descriptor.nodes));
        directives.push(format!("--ntasks-per-node={}", descriptor.tasks_per_node));
        directives.push(format!("--cpus-per-task={}", descriptor.cpus_per_task));
        if let Some(time) = &descriptor.time_limit {
            directives.push(format!("--time={}", time));
        }
        if let Some(dir) = &descriptor.working_dir {
            directives.push(format!("--chdir={}", dir.display()));
        }

        // Compact JSON never spans lines, so it cannot end the here-document early.
        let json = serde_json::to_string(definition)?;
        let body = format!(
            "exec {} run --resolved - <<'{delim}'\n{}\n{delim}\n",
            shell_quote(&launcher_exe.to_string_lossy()),
            json,
            delim = DEFINITION_DELIMITER,
        );

        Ok(Self {
            directives,
            body,
            output: descriptor.output.clone(),
            error: descriptor.error.clone(),
            working_dir: descriptor.working_dir.clone(),
        })
    }

    /// Extracts the embedded definition from a rendered script body
    pub fn embedded_definition(&self) -> Option<&str> {
        let start = self.body.find('\n')? + 1;
        let rest = &self.body[start..];
        let end = rest.find('\n')?;
        Some(&rest[..end])
    }
}

impl fmt::Display for BatchScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "#!/bin/bash")?;
        for directive in &self.directives {
            writeln!(f, "#SBATCH {}", directive)?;
        }
        writeln!(f)?;
        write!(f, "{}", self.body)
    }
}

/// Quotes a string for POSIX shells
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
