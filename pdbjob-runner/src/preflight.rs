//! Submit-time input checks
//!
//! The tool only discovers missing inputs after the job has waited in the
//! queue. These checks run on the submit host first and report every
//! problem at once.

use pdbjob_core::JobDefinition;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{LaunchError, Result};

/// Files the tool loads from the map directory
pub const MAP_FILES: [&str; 3] = [
    "atoms_residue_map.pickle",
    "atoms_type_map.pickle",
    "atoms_name_map_for_pdb.pickle",
];

/// Checks that the tool script, containers and map files exist
///
/// Relative paths are resolved against the job's working directory, or the
/// current directory when none is set.
pub fn check(definition: &JobDefinition) -> Result<()> {
    let base = match &definition.descriptor.working_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };

    let problems = problems(definition, &base);
    if problems.is_empty() {
        debug!("Preflight checks passed in {}", base.display());
        Ok(())
    } else {
        Err(LaunchError::Preflight(problems))
    }
}

/// Lists every missing input, resolved against `base`
pub fn problems(definition: &JobDefinition, base: &Path) -> Vec<String> {
    let mut problems = Vec::new();
    let resolve = |path: &Path| -> PathBuf { base.join(path) };

    let script = resolve(&definition.tool.script);
    if !script.is_file() {
        problems.push(format!("tool script {} does not exist", script.display()));
    }

    let invocation = &definition.invocation;
    let datasets = [
        ("MD dataset", invocation.md_dataset.as_deref()),
        ("QM dataset", invocation.qm_dataset.as_deref()),
    ];
    for (label, dataset) in datasets {
        if let Some(dataset) = dataset {
            let path = resolve(dataset);
            if !path.is_file() {
                problems.push(format!("{} {} does not exist", label, path.display()));
            }
        }
    }

    let map_dir = resolve(&invocation.map_dir);
    if !map_dir.is_dir() {
        problems.push(format!("map directory {} does not exist", map_dir.display()));
    } else {
        for file in MAP_FILES {
            if !map_dir.join(file).is_file() {
                problems.push(format!("map file {} is missing from {}", file, map_dir.display()));
            }
        }
    }

    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{scratch_dir, write_file};

    fn populate(base: &Path) {
        write_file(&base.join("src/data/processing/h5_to_pdb.py"), "");
        write_file(&base.join("data/MD/h5_files/MD.hdf5"), "");
        for file in MAP_FILES {
            write_file(&base.join("src/data/processing/Maps").join(file), "");
        }
    }

    #[test]
    fn test_complete_layout_passes() {
        let base = scratch_dir("preflight-ok");
        populate(&base);

        assert!(problems(&JobDefinition::default(), &base).is_empty());
    }

    #[test]
    fn test_working_dir_is_used_as_base() {
        let base = scratch_dir("preflight-workdir");
        populate(&base);

        let mut definition = JobDefinition::default();
        definition.descriptor.working_dir = Some(base);
        assert!(check(&definition).is_ok());
    }

    #[test]
    fn test_reports_every_problem() {
        let base = scratch_dir("preflight-missing");
        write_file(&base.join("src/data/processing/Maps/atoms_type_map.pickle"), "");

        let found = problems(&JobDefinition::default(), &base);
        assert_eq!(found.len(), 4);
        assert!(found[0].contains("h5_to_pdb.py"));
        assert!(found[1].contains("MD.hdf5"));
        assert!(found.iter().any(|p| p.contains("atoms_residue_map.pickle")));
        assert!(found.iter().any(|p| p.contains("atoms_name_map_for_pdb.pickle")));
    }

    #[test]
    fn test_missing_map_directory() {
        let base = scratch_dir("preflight-nomaps");
        write_file(&base.join("src/data/processing/h5_to_pdb.py"), "");
        write_file(&base.join("data/MD/h5_files/MD.hdf5"), "");

        let mut definition = JobDefinition::default();
        definition.descriptor.working_dir = Some(base);

        let err = check(&definition).unwrap_err();
        assert!(matches!(&err, LaunchError::Preflight(p) if p.len() == 1));
        assert!(err.to_string().contains("map directory"));
    }
}
