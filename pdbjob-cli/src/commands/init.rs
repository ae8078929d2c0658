//! Init command handler
//!
//! Writes a starter job definition together with Lua editor support: a stub
//! file for the `job` helper module and a .luarc.json pointing at it.

use anyhow::{Context, Result, bail};
use colored::*;
use pdbjob_lua::JOB_MODULE_STUBS;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

/// Starter definition; evaluates to the built-in defaults
const JOB_TEMPLATE: &str = r#"-- pdbjob job definition
--
-- Submit with `pdbjob submit job.lua`. Every section is optional.

return job.define {
    resources = {
        job_name = "h5_to_pdb",
        partition = "cpu",
        output = "logs/h5_to_pdb_%j.out",
        nodes = 1,
        tasks_per_node = 1,
        cpus_per_task = 8,
        -- time = "24:00:00",
    },

    environment = job.conda("misato"),

    tool = {
        interpreter = "python",
        script = "src/data/processing/h5_to_pdb.py",
    },

    convert = {
        select = job.all(),
        -- frame = 0,
        md = "data/MD/h5_files/MD.hdf5",
        -- qm = "data/QM/h5_files/QM.hdf5",
        maps = "src/data/processing/Maps/",
        -- save_dir = "pdb_out/",
    },

    completion = "strict",
}
"#;

const LUARC_TEMPLATE: &str = r#"{
  "$schema": "https://raw.githubusercontent.com/sumneko/vscode-lua/master/setting/schema.json",
  "runtime": {
    "version": "Lua 5.4"
  },
  "diagnostics": {
    "globals": ["job"]
  },
  "workspace": {
    "library": [".pdbjob/stubs"],
    "checkThirdParty": false
  },
  "completion": {
    "callSnippet": "Both"
  }
}
"#;

/// Generate the starter files in `output_dir`
pub fn handle_init(output_dir: &Path, force: bool) -> Result<ExitCode> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let job_path = output_dir.join("job.lua");
    if job_path.exists() && !force {
        bail!(
            "{} already exists, use --force to overwrite it",
            job_path.display()
        );
    }
    fs::write(&job_path, JOB_TEMPLATE)
        .with_context(|| format!("Failed to write {}", job_path.display()))?;
    println!("  {} job.lua", "Created".green());

    generate_luarc_json(output_dir)?;
    generate_stub_file(output_dir)?;

    println!("{}", "✓ Job definition generated!".green().bold());
    println!();
    println!("{}", "Next steps:".bold());
    println!("  1. Adjust partition, environment and datasets in job.lua");
    println!("  2. Check inputs with {}", "pdbjob validate job.lua".cyan());
    println!("  3. Submit with {}", "pdbjob submit job.lua".cyan());

    Ok(ExitCode::SUCCESS)
}

/// Generate .luarc.json for Lua LSP configuration
fn generate_luarc_json(output_path: &Path) -> Result<()> {
    let luarc_path = output_path.join(".luarc.json");

    fs::write(&luarc_path, LUARC_TEMPLATE)
        .with_context(|| format!("Failed to write .luarc.json to {:?}", luarc_path))?;

    println!("  {} .luarc.json", "Created".green());

    Ok(())
}

/// Generate the stub file for the `job` helper module
fn generate_stub_file(output_path: &Path) -> Result<()> {
    let stubs_dir = output_path.join(".pdbjob").join("stubs");
    fs::create_dir_all(&stubs_dir)
        .with_context(|| format!("Failed to create stubs directory at {:?}", stubs_dir))?;

    let stub_path = stubs_dir.join("job.lua");
    fs::write(&stub_path, JOB_MODULE_STUBS)
        .with_context(|| format!("Failed to write stub file {:?}", stub_path))?;

    println!("  {} .pdbjob/stubs/job.lua", "Created".green());

    Ok(())
}
