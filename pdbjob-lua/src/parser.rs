//! Job definition parser
//!
//! Evaluates a Lua job definition in the sandbox and converts the returned
//! table into a [`JobDefinition`]. Every section is optional; missing fields
//! keep the built-in defaults, so an empty table describes the standard
//! MD-to-PDB conversion job.

use anyhow::{Context, Result, bail};
use mlua::{FromLua, Table, Value};
use pdbjob_core::{
    CompletionPolicy, EnvironmentSpec, InvocationSpec, JobDefinition, JobDescriptor,
    SelectionMode, ToolSpec,
};
use std::path::{Path, PathBuf};

use crate::sandbox::create_sandbox;

const TOP_LEVEL_KEYS: &[&str] = &["resources", "environment", "tool", "convert", "completion"];
const RESOURCE_KEYS: &[&str] = &[
    "job_name",
    "partition",
    "output",
    "error",
    "nodes",
    "tasks_per_node",
    "cpus_per_task",
    "time",
    "workdir",
];
const TOOL_KEYS: &[&str] = &["interpreter", "script"];
const CONVERT_KEYS: &[&str] = &["select", "frame", "md", "qm", "maps", "save_dir"];

/// Parse a job definition from Lua source code
///
/// # Example
/// ```no_run
/// use pdbjob_lua::parse_job_definition;
///
/// let source = r#"
///     return job.define {
///         resources = { partition = "gpu", cpus_per_task = 16 },
///         environment = job.conda("misato"),
///         convert = { select = job.structure("11gs"), frame = 10, md = "MD.hdf5" },
///     }
/// "#;
///
/// let definition = parse_job_definition(source)?;
/// assert_eq!(definition.descriptor.cpus_per_task, 16);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn parse_job_definition(source: &str) -> Result<JobDefinition> {
    let lua = create_sandbox().context("Failed to create definition sandbox")?;

    let table: Table = lua
        .load(source)
        .set_name("job definition")
        .eval()
        .context("Failed to evaluate job definition")?;

    check_keys(&table, "job definition", TOP_LEVEL_KEYS)?;

    let descriptor = parse_resources(&table)?;
    let environment = parse_environment(&table)?;
    let tool = parse_tool(&table)?;
    let invocation = parse_convert(&table)?;

    let completion = match field::<Option<String>>(&table, "completion", "job definition")? {
        Some(policy) => policy
            .parse::<CompletionPolicy>()
            .map_err(|e| anyhow::anyhow!(e))?,
        None => CompletionPolicy::default(),
    };

    Ok(JobDefinition {
        descriptor,
        environment,
        tool,
        invocation,
        completion,
    })
}

/// Read and parse a job definition file
pub fn load_job_definition(path: &Path) -> Result<JobDefinition> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read job definition {}", path.display()))?;

    parse_job_definition(&source)
        .with_context(|| format!("Invalid job definition {}", path.display()))
}

/// Parse the 'resources' section into scheduler directives
fn parse_resources(table: &Table) -> Result<JobDescriptor> {
    let mut descriptor = JobDescriptor::default();

    let Some(resources) = section(table, "resources")? else {
        return Ok(descriptor);
    };
    check_keys(&resources, "resources", RESOURCE_KEYS)?;

    if let Some(name) = field(&resources, "job_name", "resources")? {
        descriptor.job_name = name;
    }
    if let Some(partition) = field(&resources, "partition", "resources")? {
        descriptor.partition = partition;
    }
    if let Some(output) = field(&resources, "output", "resources")? {
        descriptor.output = output;
    }
    descriptor.error = field(&resources, "error", "resources")?;
    if let Some(nodes) = field(&resources, "nodes", "resources")? {
        descriptor.nodes = nodes;
    }
    if let Some(tasks) = field(&resources, "tasks_per_node", "resources")? {
        descriptor.tasks_per_node = tasks;
    }
    if let Some(cpus) = field(&resources, "cpus_per_task", "resources")? {
        descriptor.cpus_per_task = cpus;
    }
    descriptor.time_limit = field(&resources, "time", "resources")?;
    descriptor.working_dir = field::<Option<String>>(&resources, "workdir", "resources")?
        .map(PathBuf::from);

    Ok(descriptor)
}

/// Parse the 'environment' field
///
/// Accepts a bare string (a conda environment name) or a table built by
/// `job.conda`, `job.prefix` or `job.inherit`.
fn parse_environment(table: &Table) -> Result<EnvironmentSpec> {
    let value: Value = table.get("environment").unwrap_or(Value::Nil);

    match value {
        Value::Nil => Ok(EnvironmentSpec::default()),
        Value::String(name) => Ok(EnvironmentSpec::Conda {
            name: name.to_str()?.to_string(),
        }),
        Value::Table(env) => {
            let kind: String = env
                .get("kind")
                .context("Field 'environment' must have a 'kind'")?;

            match kind.as_str() {
                "conda" => {
                    let name: String = env
                        .get("name")
                        .context("Conda environment must have a 'name'")?;
                    Ok(EnvironmentSpec::Conda { name })
                }
                "prefix" => {
                    let path: String = env
                        .get("path")
                        .context("Prefix environment must have a 'path'")?;
                    Ok(EnvironmentSpec::Prefix {
                        path: PathBuf::from(path),
                    })
                }
                "inherit" => Ok(EnvironmentSpec::Inherit),
                other => bail!(
                    "Unknown environment kind '{}', expected 'conda', 'prefix' or 'inherit'",
                    other
                ),
            }
        }
        _ => bail!("Field 'environment' must be a string or an environment table"),
    }
}

/// Parse the 'tool' section
fn parse_tool(table: &Table) -> Result<ToolSpec> {
    let mut tool = ToolSpec::default();

    let Some(section) = section(table, "tool")? else {
        return Ok(tool);
    };
    check_keys(&section, "tool", TOOL_KEYS)?;

    if let Some(interpreter) = field(&section, "interpreter", "tool")? {
        tool.interpreter = interpreter;
    }
    if let Some(script) = field::<Option<String>>(&section, "script", "tool")? {
        tool.script = PathBuf::from(script);
    }

    Ok(tool)
}

/// Parse the 'convert' section into the tool's argument set
///
/// Datasets are replaced as a pair: naming either `md` or `qm` drops the
/// default MD container, so a QM-only job does not inherit it.
fn parse_convert(table: &Table) -> Result<InvocationSpec> {
    let mut spec = InvocationSpec::default();

    let Some(convert) = section(table, "convert")? else {
        return Ok(spec);
    };
    check_keys(&convert, "convert", CONVERT_KEYS)?;

    if let Some(select) = field::<Option<String>>(&convert, "select", "convert")? {
        spec.selection = SelectionMode::parse(&select);
    }
    spec.frame = field(&convert, "frame", "convert")?;

    let md: Option<String> = field(&convert, "md", "convert")?;
    let qm: Option<String> = field(&convert, "qm", "convert")?;
    if md.is_some() || qm.is_some() {
        spec.md_dataset = md.map(PathBuf::from);
        spec.qm_dataset = qm.map(PathBuf::from);
    }

    if let Some(maps) = field::<Option<String>>(&convert, "maps", "convert")? {
        spec.map_dir = PathBuf::from(maps);
    }
    spec.save_dir = field::<Option<String>>(&convert, "save_dir", "convert")?.map(PathBuf::from);

    Ok(spec)
}

/// Get an optional sub-table
fn section(table: &Table, key: &str) -> Result<Option<Table>> {
    match table.get::<Value>(key).unwrap_or(Value::Nil) {
        Value::Nil => Ok(None),
        Value::Table(section) => Ok(Some(section)),
        _ => bail!("Field '{}' must be a table", key),
    }
}

/// Get a typed field, naming the section in the error
fn field<T: FromLua>(table: &Table, key: &str, section: &str) -> Result<T> {
    table
        .get::<T>(key)
        .with_context(|| format!("Field '{}' in {} has the wrong type", key, section))
}

/// Reject keys the parser does not know, so typos are not silently ignored
fn check_keys(table: &Table, section: &str, allowed: &[&str]) -> Result<()> {
    for pair in table.pairs::<Value, Value>() {
        let (key, _) = pair.with_context(|| format!("Failed to read {} entry", section))?;

        let name = match &key {
            Value::String(s) => s.to_str()?.to_string(),
            _ => bail!("{} must only use string keys", section),
        };

        if !allowed.contains(&name.as_str()) {
            bail!(
                "Unknown field '{}' in {} (expected one of: {})",
                name,
                section,
                allowed.join(", ")
            );
        }
    }

    Ok(())
}
