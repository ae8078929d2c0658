//! Runtime environment activation
//!
//! Activation binds a pre-built environment to the tool process. Instead of
//! sourcing activation scripts into a shell, the launcher resolves the
//! environment's prefix and hands the resulting variables to the child.
//! Hook scripts under `etc/conda/activate.d` are not run.

use async_trait::async_trait;
use pdbjob_core::EnvironmentSpec;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{LaunchError, Result};

/// Variables to apply to the tool process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivatedEnvironment {
    /// Root of the activated environment, if any
    pub prefix: Option<PathBuf>,
    /// Variables to set
    pub set: Vec<(String, OsString)>,
    /// Variables to remove
    pub unset: Vec<String>,
}

impl ActivatedEnvironment {
    /// The launcher's own environment, unchanged
    pub fn inherited() -> Self {
        Self::default()
    }

    /// Applies the variables to a command
    pub fn apply(&self, command: &mut Command) {
        for key in &self.unset {
            command.env_remove(key);
        }
        for (key, value) in &self.set {
            command.env(key, value);
        }
    }

    /// Looks up a variable this activation sets
    pub fn var(&self, key: &str) -> Option<&OsString> {
        self.set.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// Binds a runtime environment for the tool
#[async_trait]
pub trait EnvironmentActivator: Send + Sync {
    /// Activates the environment
    ///
    /// Any error is fatal: the caller must not start the tool afterwards.
    async fn activate(&self, spec: &EnvironmentSpec) -> Result<ActivatedEnvironment>;
}

/// Standard implementation of EnvironmentActivator
pub struct StandardActivator {
    conda_exe: PathBuf,
}

/// Reply of `conda env list --json`
#[derive(Debug, Deserialize)]
struct CondaEnvList {
    envs: Vec<PathBuf>,
}

impl StandardActivator {
    /// Creates an activator that resolves named environments with `conda_exe`
    pub fn new(conda_exe: PathBuf) -> Self {
        Self { conda_exe }
    }

    /// Resolves a conda environment name to its prefix
    async fn resolve_conda_prefix(&self, spec: &EnvironmentSpec, name: &str) -> Result<PathBuf> {
        if Path::new(name).is_absolute() {
            return Ok(PathBuf::from(name));
        }

        debug!("Listing conda environments with {}", self.conda_exe.display());

        let output = Command::new(&self.conda_exe)
            .args(["env", "list", "--json"])
            .output()
            .await
            .map_err(|e| {
                LaunchError::activation(
                    spec,
                    format!("failed to run {}: {}", self.conda_exe.display(), e),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LaunchError::activation(
                spec,
                format!(
                    "'conda env list' exited with {}: {}",
                    output.status.code().unwrap_or(-1),
                    stderr.trim()
                ),
            ));
        }

        let list: CondaEnvList = serde_json::from_slice(&output.stdout).map_err(|e| {
            LaunchError::activation(spec, format!("unreadable 'conda env list' output: {}", e))
        })?;

        find_conda_env(&list.envs, name).ok_or_else(|| {
            LaunchError::activation(spec, format!("no conda environment named '{}'", name))
        })
    }
}

#[async_trait]
impl EnvironmentActivator for StandardActivator {
    async fn activate(&self, spec: &EnvironmentSpec) -> Result<ActivatedEnvironment> {
        let activated = match spec {
            EnvironmentSpec::Inherit => ActivatedEnvironment::inherited(),
            EnvironmentSpec::Conda { name } => {
                let prefix = self.resolve_conda_prefix(spec, name).await?;
                let mut activated = prefix_environment(spec, &prefix)?;
                activated
                    .set
                    .push(("CONDA_PREFIX".to_string(), prefix.clone().into_os_string()));
                activated
                    .set
                    .push(("CONDA_DEFAULT_ENV".to_string(), OsString::from(name)));
                activated
            }
            EnvironmentSpec::Prefix { path } => {
                let mut activated = prefix_environment(spec, path)?;
                activated
                    .set
                    .push(("VIRTUAL_ENV".to_string(), path.clone().into_os_string()));
                activated
            }
        };

        match &activated.prefix {
            Some(prefix) => info!("Activated environment {} at {}", spec, prefix.display()),
            None => info!("Using inherited environment"),
        }

        Ok(activated)
    }
}

/// Finds a conda environment by name in `conda env list` output
///
/// `base` is the root installation, i.e. the entry that is not inside an
/// `envs` directory.
fn find_conda_env(envs: &[PathBuf], name: &str) -> Option<PathBuf> {
    let in_envs_dir = |path: &PathBuf| {
        path.parent()
            .and_then(|parent| parent.file_name())
            .is_some_and(|dir| dir == "envs")
    };

    if name == "base" {
        return envs.iter().find(|path| !in_envs_dir(path)).cloned();
    }

    envs.iter()
        .find(|path| path.file_name().is_some_and(|file| file == name))
        .cloned()
}

/// Builds the PATH-based part of an activation for a prefix directory
fn prefix_environment(spec: &EnvironmentSpec, prefix: &Path) -> Result<ActivatedEnvironment> {
    let bin = prefix.join("bin");
    if !bin.is_dir() {
        return Err(LaunchError::activation(
            spec,
            format!("{} has no bin directory", prefix.display()),
        ));
    }

    let current = std::env::var_os("PATH").unwrap_or_default();
    let path = std::env::join_paths(
        std::iter::once(bin.clone()).chain(std::env::split_paths(&current)),
    )
    .map_err(|e| LaunchError::activation(spec, format!("cannot extend PATH: {}", e)))?;

    Ok(ActivatedEnvironment {
        prefix: Some(prefix.to_path_buf()),
        set: vec![("PATH".to_string(), path)],
        unset: vec!["PYTHONHOME".to_string()],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{scratch_dir, write_executable};

    fn fake_conda(root: &Path) -> PathBuf {
        std::fs::create_dir_all(root.join("miniconda/bin")).unwrap();
        std::fs::create_dir_all(root.join("miniconda/envs/misato/bin")).unwrap();

        let reply = format!(
            r#"{{"envs": ["{root}/miniconda", "{root}/miniconda/envs/misato", "{root}/miniconda/envs/broken"]}}"#,
            root = root.display()
        );
        write_executable(root, "conda", &format!("echo '{}'", reply))
    }

    #[test]
    fn test_find_conda_env() {
        let envs = vec![
            PathBuf::from("/opt/conda"),
            PathBuf::from("/opt/conda/envs/misato"),
            PathBuf::from("/home/user/.conda/envs/tools"),
        ];

        assert_eq!(
            find_conda_env(&envs, "base"),
            Some(PathBuf::from("/opt/conda"))
        );
        assert_eq!(
            find_conda_env(&envs, "tools"),
            Some(PathBuf::from("/home/user/.conda/envs/tools"))
        );
        assert_eq!(find_conda_env(&envs, "missing"), None);
    }

    #[tokio::test]
    async fn test_inherit_sets_nothing() {
        let activator = StandardActivator::new(PathBuf::from("/nonexistent/conda"));
        let activated = activator.activate(&EnvironmentSpec::Inherit).await.unwrap();
        assert_eq!(activated, ActivatedEnvironment::inherited());
    }

    #[tokio::test]
    async fn test_conda_activation() {
        let root = scratch_dir("conda");
        let activator = StandardActivator::new(fake_conda(&root));

        let spec = EnvironmentSpec::Conda {
            name: "misato".to_string(),
        };
        let activated = activator.activate(&spec).await.unwrap();

        let prefix = root.join("miniconda/envs/misato");
        assert_eq!(activated.prefix, Some(prefix.clone()));
        assert_eq!(
            activated.var("CONDA_PREFIX"),
            Some(&prefix.clone().into_os_string())
        );
        assert_eq!(
            activated.var("CONDA_DEFAULT_ENV"),
            Some(&OsString::from("misato"))
        );

        let path = activated.var("PATH").unwrap();
        let first = std::env::split_paths(path).next().unwrap();
        assert_eq!(first, prefix.join("bin"));
        assert_eq!(activated.unset, vec!["PYTHONHOME".to_string()]);
    }

    #[tokio::test]
    async fn test_conda_environment_not_found() {
        let root = scratch_dir("conda-missing");
        let activator = StandardActivator::new(fake_conda(&root));

        let spec = EnvironmentSpec::Conda {
            name: "nope".to_string(),
        };
        let err = activator.activate(&spec).await.unwrap_err();
        assert!(err.is_activation_failure());
        assert!(err.to_string().contains("nope"));
    }

    #[tokio::test]
    async fn test_conda_environment_without_bin() {
        let root = scratch_dir("conda-broken");
        let activator = StandardActivator::new(fake_conda(&root));

        let spec = EnvironmentSpec::Conda {
            name: "broken".to_string(),
        };
        let err = activator.activate(&spec).await.unwrap_err();
        assert!(err.is_activation_failure());
        assert!(err.to_string().contains("bin"));
    }

    #[tokio::test]
    async fn test_missing_conda_executable() {
        let activator = StandardActivator::new(PathBuf::from("/nonexistent/conda"));
        let spec = EnvironmentSpec::Conda {
            name: "misato".to_string(),
        };

        let err = activator.activate(&spec).await.unwrap_err();
        assert!(err.is_activation_failure());
    }

    #[tokio::test]
    async fn test_prefix_activation() {
        let root = scratch_dir("venv");
        std::fs::create_dir_all(root.join("bin")).unwrap();

        let activator = StandardActivator::new(PathBuf::from("conda"));
        let spec = EnvironmentSpec::Prefix { path: root.clone() };
        let activated = activator.activate(&spec).await.unwrap();

        assert_eq!(
            activated.var("VIRTUAL_ENV"),
            Some(&root.clone().into_os_string())
        );
        assert!(activated.var("CONDA_PREFIX").is_none());
    }

    #[tokio::test]
    async fn test_prefix_must_exist() {
        let activator = StandardActivator::new(PathBuf::from("conda"));
        let spec = EnvironmentSpec::Prefix {
            path: PathBuf::from("/nonexistent/venv"),
        };

        assert!(activator.activate(&spec).await.unwrap_err().is_activation_failure());
    }
}
