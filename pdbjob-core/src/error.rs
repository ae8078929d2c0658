//! Validation errors for job definitions

use thiserror::Error;

/// Reasons a job definition is rejected before anything is submitted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// A required text field is empty
    #[error("Field '{0}' cannot be empty")]
    EmptyField(&'static str),

    /// Scheduler directives are written one per line
    #[error("Field '{0}' cannot contain a line break")]
    MultilineValue(&'static str),

    /// A resource count is zero
    #[error("Field '{0}' must be greater than 0")]
    ZeroResource(&'static str),

    /// Neither an MD nor a QM container was given
    #[error("Provide either an MD or a QM dataset")]
    MissingDataset,

    /// `all` only walks MD containers
    #[error("Selection 'all' requires an MD dataset")]
    AllRequiresMd,

    /// An option that only applies to single-structure conversion
    #[error("Option '{0}' is only valid when converting a single structure")]
    StructureOnly(&'static str),

    /// Structure codes are PDB identifiers such as `11gs`
    #[error("Invalid structure code '{0}': expected ASCII letters and digits")]
    InvalidStructureCode(String),

    /// The tool appends map file names to the directory verbatim
    #[error("Map directory '{0}' must end with '/'")]
    MapDirWithoutTrailingSlash(String),
}
