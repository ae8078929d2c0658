//! Runtime environment selection

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// The pre-built environment the tool runs in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnvironmentSpec {
    /// A named conda environment, or an absolute path to one
    Conda { name: String },
    /// A virtualenv-style directory with a `bin/` folder
    Prefix { path: PathBuf },
    /// Run with the launcher's own environment
    Inherit,
}

impl Default for EnvironmentSpec {
    fn default() -> Self {
        EnvironmentSpec::Conda {
            name: "misato".to_string(),
        }
    }
}

impl fmt::Display for EnvironmentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvironmentSpec::Conda { name } => write!(f, "conda:{}", name),
            EnvironmentSpec::Prefix { path } => write!(f, "prefix:{}", path.display()),
            EnvironmentSpec::Inherit => write!(f, "inherit"),
        }
    }
}
