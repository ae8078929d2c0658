//! Validate command handler

use anyhow::{Context, Result};
use colored::*;
use pdbjob_core::JobDefinition;
use pdbjob_runner::preflight;
use std::path::Path;
use std::process::ExitCode;

use super::load_definition;

/// Check a definition and its inputs without submitting anything
pub fn handle_validate(path: Option<&Path>) -> Result<ExitCode> {
    let definition = load_definition(path)?;

    if let Err(e) = definition.validate() {
        println!("{} {}", "✗".red().bold(), e);
        return Ok(ExitCode::FAILURE);
    }

    print_summary(&definition);

    let base = match &definition.descriptor.working_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };
    let problems = preflight::problems(&definition, &base);

    println!();
    if problems.is_empty() {
        println!("{}", "✓ Definition is valid and all inputs exist".green().bold());
        Ok(ExitCode::SUCCESS)
    } else {
        println!(
            "{}",
            format!("✗ {} missing input(s):", problems.len()).red().bold()
        );
        for problem in problems {
            println!("  - {}", problem);
        }
        Ok(ExitCode::FAILURE)
    }
}

fn print_summary(definition: &JobDefinition) {
    let descriptor = &definition.descriptor;
    let tool = &definition.tool;

    println!("{}", "Job Definition".bold());
    println!("  {}: {}", "Name".bold(), descriptor.job_name);
    println!("  {}: {}", "Partition".bold(), descriptor.partition);
    println!(
        "  {}: {} node(s) x {} task(s), {} CPU(s) per task",
        "Resources".bold(),
        descriptor.nodes,
        descriptor.tasks_per_node,
        descriptor.cpus_per_task
    );
    if let Some(time) = &descriptor.time_limit {
        println!("  {}: {}", "Time limit".bold(), time);
    }
    println!("  {}: {}", "Output".bold(), descriptor.output);
    println!(
        "  {}: {}",
        "Environment".bold(),
        definition.environment.to_string().cyan()
    );
    println!(
        "  {}: {} {} {}",
        "Command".bold(),
        tool.interpreter,
        tool.script.display(),
        definition.invocation.command_line()
    );
    println!("  {}: {}", "Completion".bold(), definition.completion);
}
