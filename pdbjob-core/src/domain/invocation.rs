//! Arguments handed to the conversion tool
//!
//! `h5_to_pdb.py` is an external program; this module only knows its flag
//! contract. Values are passed through verbatim, so a path written with a
//! trailing slash reaches the tool with that slash intact.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

use crate::error::DefinitionError;

/// Which structures the tool converts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SelectionMode {
    /// Every structure and every frame in the MD container
    All,
    /// A single structure, identified by its PDB code
    Structure(String),
}

impl SelectionMode {
    /// Parses the value of the `-s` flag
    ///
    /// Matching of `all` is case-insensitive, like the tool itself.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("all") {
            SelectionMode::All
        } else {
            SelectionMode::Structure(value.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SelectionMode::All => "all",
            SelectionMode::Structure(code) => code,
        }
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for SelectionMode {
    fn from(value: String) -> Self {
        SelectionMode::parse(&value)
    }
}

impl From<SelectionMode> for String {
    fn from(mode: SelectionMode) -> Self {
        mode.as_str().to_string()
    }
}

/// The argument set for one tool invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationSpec {
    /// `-s`
    pub selection: SelectionMode,
    /// `-f`, frame index within the trajectory
    #[serde(default)]
    pub frame: Option<u32>,
    /// `-dMD`
    #[serde(default)]
    pub md_dataset: Option<PathBuf>,
    /// `-dQM`
    #[serde(default)]
    pub qm_dataset: Option<PathBuf>,
    /// `-mdir`
    pub map_dir: PathBuf,
    /// `--base_save_dir`
    #[serde(default)]
    pub save_dir: Option<PathBuf>,
}

impl Default for InvocationSpec {
    fn default() -> Self {
        Self {
            selection: SelectionMode::All,
            frame: None,
            md_dataset: Some(PathBuf::from("data/MD/h5_files/MD.hdf5")),
            qm_dataset: None,
            map_dir: PathBuf::from("src/data/processing/Maps/"),
            save_dir: None,
        }
    }
}

impl InvocationSpec {
    /// Renders the flag list in the order the tool documents them
    pub fn to_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-s".into(), self.selection.as_str().into()];

        if let Some(frame) = self.frame {
            args.push("-f".into());
            args.push(frame.to_string().into());
        }
        if let Some(md) = &self.md_dataset {
            args.push("-dMD".into());
            args.push(md.clone().into_os_string());
        }
        if let Some(qm) = &self.qm_dataset {
            args.push("-dQM".into());
            args.push(qm.clone().into_os_string());
        }

        args.push("-mdir".into());
        args.push(self.map_dir.clone().into_os_string());

        if let Some(dir) = &self.save_dir {
            args.push("--base_save_dir".into());
            args.push(dir.clone().into_os_string());
        }

        args
    }

    /// Renders the flag list as a single space-separated line for display
    pub fn command_line(&self) -> String {
        self.to_args()
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Checks the combination of flags against what the tool accepts
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.md_dataset.is_none() && self.qm_dataset.is_none() {
            return Err(DefinitionError::MissingDataset);
        }

        match &self.selection {
            SelectionMode::All => {
                if self.md_dataset.is_none() {
                    return Err(DefinitionError::AllRequiresMd);
                }
                if self.frame.is_some() {
                    return Err(DefinitionError::StructureOnly("frame"));
                }
                if self.qm_dataset.is_some() {
                    return Err(DefinitionError::StructureOnly("qm_dataset"));
                }
            }
            SelectionMode::Structure(code) => {
                if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
                    return Err(DefinitionError::InvalidStructureCode(code.clone()));
                }
            }
        }

        let map_dir = self.map_dir.to_string_lossy();
        if map_dir.is_empty() {
            return Err(DefinitionError::EmptyField("map_dir"));
        }
        if !map_dir.ends_with('/') {
            return Err(DefinitionError::MapDirWithoutTrailingSlash(
                map_dir.into_owned(),
            ));
        }

        Ok(())
    }
}
