//! Launcher configuration
//!
//! Defines the external programs the launcher talks to and which scheduler
//! back-end receives submissions. Everything here describes the host, not
//! the job; job settings live in the job definition.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Which scheduler back-end receives submissions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SchedulerKind {
    /// Queue through `sbatch`
    #[default]
    Slurm,
    /// Run the batch script right away on this machine
    Local,
}

impl fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerKind::Slurm => write!(f, "slurm"),
            SchedulerKind::Local => write!(f, "local"),
        }
    }
}

impl FromStr for SchedulerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "slurm" => Ok(SchedulerKind::Slurm),
            "local" => Ok(SchedulerKind::Local),
            other => Err(format!(
                "unknown scheduler '{}', expected 'slurm' or 'local'",
                other
            )),
        }
    }
}

/// Launcher configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// conda executable used to resolve named environments
    pub conda_exe: PathBuf,

    /// sbatch executable used by the SLURM back-end
    pub sbatch: PathBuf,

    /// Shell used by the local back-end
    pub shell: PathBuf,

    /// Scheduler back-end for submissions
    pub scheduler: SchedulerKind,

    /// Launcher binary written into batch scripts (None = current executable)
    pub launcher_exe: Option<PathBuf>,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new() -> Self {
        Self {
            conda_exe: PathBuf::from("conda"),
            sbatch: PathBuf::from("sbatch"),
            shell: PathBuf::from("sh"),
            scheduler: SchedulerKind::Slurm,
            launcher_exe: None,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Recognised environment variables:
    /// - PDBJOB_CONDA (falls back to CONDA_EXE, then `conda`)
    /// - PDBJOB_SBATCH (default: `sbatch`)
    /// - PDBJOB_SHELL (default: `sh`)
    /// - PDBJOB_SCHEDULER (`slurm` or `local`, default: `slurm`)
    /// - PDBJOB_LAUNCHER (default: the running executable)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();
        let lookup = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(conda) = lookup("PDBJOB_CONDA").or_else(|| lookup("CONDA_EXE")) {
            config.conda_exe = PathBuf::from(conda);
        }
        if let Some(sbatch) = lookup("PDBJOB_SBATCH") {
            config.sbatch = PathBuf::from(sbatch);
        }
        if let Some(shell) = lookup("PDBJOB_SHELL") {
            config.shell = PathBuf::from(shell);
        }
        if let Some(scheduler) = lookup("PDBJOB_SCHEDULER") {
            config.scheduler = scheduler
                .parse()
                .map_err(|e: String| anyhow::anyhow!("PDBJOB_SCHEDULER: {}", e))?;
        }
        config.launcher_exe = lookup("PDBJOB_LAUNCHER").map(PathBuf::from);

        Ok(config)
    }

    /// Overrides the scheduler back-end
    pub fn with_scheduler(mut self, scheduler: SchedulerKind) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Resolves the launcher binary that batch scripts call back into
    pub fn launcher_exe(&self) -> anyhow::Result<PathBuf> {
        match &self.launcher_exe {
            Some(path) => Ok(path.clone()),
            None => std::env::current_exe()
                .map_err(|e| anyhow::anyhow!("Failed to locate launcher executable: {}", e)),
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.conda_exe.as_os_str().is_empty() {
            anyhow::bail!("conda_exe cannot be empty");
        }

        if self.sbatch.as_os_str().is_empty() {
            anyhow::bail!("sbatch cannot be empty");
        }

        if self.shell.as_os_str().is_empty() {
            anyhow::bail!("shell cannot be empty");
        }

        if let Some(exe) = &self.launcher_exe {
            if !exe.is_absolute() {
                anyhow::bail!("launcher_exe must be an absolute path, got {}", exe.display());
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.conda_exe, PathBuf::from("conda"));
        assert_eq!(config.sbatch, PathBuf::from("sbatch"));
        assert_eq!(config.scheduler, SchedulerKind::Slurm);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_lookup() {
        let config = Config::from_lookup(lookup_from(&[
            ("PDBJOB_SBATCH", "/opt/slurm/bin/sbatch"),
            ("PDBJOB_SCHEDULER", "LOCAL"),
            ("PDBJOB_LAUNCHER", "/usr/local/bin/pdbjob"),
            ("CONDA_EXE", "/opt/miniconda/bin/conda"),
        ]))
        .unwrap();

        assert_eq!(config.sbatch, PathBuf::from("/opt/slurm/bin/sbatch"));
        assert_eq!(config.scheduler, SchedulerKind::Local);
        assert_eq!(config.conda_exe, PathBuf::from("/opt/miniconda/bin/conda"));
        assert_eq!(
            config.launcher_exe().unwrap(),
            PathBuf::from("/usr/local/bin/pdbjob")
        );
    }

    #[test]
    fn test_pdbjob_conda_wins_over_conda_exe() {
        let config = Config::from_lookup(lookup_from(&[
            ("PDBJOB_CONDA", "/apps/mamba/bin/conda"),
            ("CONDA_EXE", "/opt/miniconda/bin/conda"),
        ]))
        .unwrap();

        assert_eq!(config.conda_exe, PathBuf::from("/apps/mamba/bin/conda"));
    }

    #[test]
    fn test_unknown_scheduler_is_rejected() {
        let result = Config::from_lookup(lookup_from(&[("PDBJOB_SCHEDULER", "pbs")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.launcher_exe = Some(PathBuf::from("target/debug/pdbjob"));
        assert!(config.validate().is_err());

        config.launcher_exe = Some(PathBuf::from("/usr/local/bin/pdbjob"));
        assert!(config.validate().is_ok());

        config.shell = PathBuf::new();
        assert!(config.validate().is_err());
    }
}
