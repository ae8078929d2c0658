//! End-to-end tests for the `pdbjob` binary
//!
//! The conversion tool is replaced by small `sh` scripts; everything else
//! (definition loading, activation, the batch script handoff and exit
//! codes) runs for real.

use pdbjob_core::{CompletionPolicy, EnvironmentSpec, JobDefinition, ToolSpec};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

const TOOL_LINE: &str = "h5_to_pdb: wrote 11gs_frame0.pdb";

fn pdbjob() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_pdbjob"));
    command
        .env_remove("PDBJOB_SCHEDULER")
        .env("PDBJOB_LAUNCHER", env!("CARGO_BIN_EXE_pdbjob"))
        .env("RUST_LOG", "off");
    command
}

fn scratch_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("pdbjob-cli-{}-{}", label, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// A definition whose tool is `sh <dir>/tool.sh` in the inherited environment
fn tool_definition(dir: &Path, body: &str) -> JobDefinition {
    let script = dir.join("tool.sh");
    fs::write(&script, body).unwrap();

    JobDefinition {
        environment: EnvironmentSpec::Inherit,
        tool: ToolSpec {
            interpreter: "sh".to_string(),
            script,
        },
        ..JobDefinition::default()
    }
}

fn run_resolved(definition: &JobDefinition) -> Output {
    let mut child = pdbjob()
        .args(["run", "--resolved", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    let json = serde_json::to_string(definition).unwrap();
    let mut stdin = child.stdin.take().unwrap();
    stdin.write_all(json.as_bytes()).unwrap();
    drop(stdin);

    child.wait_with_output().unwrap()
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_run_reports_done_after_success() {
    let dir = scratch_dir("run-ok");
    let definition = tool_definition(&dir, &format!("echo '{}'\n", TOOL_LINE));

    let output = run_resolved(&definition);

    assert_eq!(output.status.code(), Some(0));
    let lines = stdout_lines(&output);
    assert!(lines.contains(&TOOL_LINE.to_string()));
    assert_eq!(lines.last().map(String::as_str), Some("Done"));
}

#[test]
fn test_run_exits_with_tool_status_under_strict() {
    let dir = scratch_dir("run-strict");
    let definition = tool_definition(&dir, "exit 3\n");

    let output = run_resolved(&definition);

    assert_eq!(output.status.code(), Some(3));
    assert_eq!(
        stdout_lines(&output).last().map(String::as_str),
        Some("Failed (exit status 3)")
    );
}

#[test]
fn test_run_exits_zero_under_unconditional() {
    let dir = scratch_dir("run-unconditional");
    let mut definition = tool_definition(&dir, "exit 3\n");
    definition.completion = CompletionPolicy::Unconditional;

    let output = run_resolved(&definition);

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout_lines(&output).last().map(String::as_str), Some("Done"));
}

#[test]
fn test_run_activation_failure_exits_one() {
    let dir = scratch_dir("run-noenv");
    let ran = dir.join("tool-ran");
    let mut definition = tool_definition(&dir, &format!("touch '{}'\n", ran.display()));
    definition.environment = EnvironmentSpec::Prefix {
        path: dir.join("missing-venv"),
    };

    let output = run_resolved(&definition);

    assert_eq!(output.status.code(), Some(1));
    assert!(!ran.exists());
    assert!(!stdout_lines(&output).contains(&"Done".to_string()));
}

#[test]
fn test_run_invalid_definition_exits_two() {
    let dir = scratch_dir("run-invalid");
    let mut definition = tool_definition(&dir, "exit 0\n");
    definition.descriptor.nodes = 0;

    let output = run_resolved(&definition);

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_local_submit_with_relative_working_dir() {
    let dir = scratch_dir("submit-local");
    let mut definition = tool_definition(&dir, &format!("echo '{}'\n", TOOL_LINE));
    definition.descriptor.working_dir = Some(PathBuf::from("work"));
    fs::write(
        dir.join("job.json"),
        serde_json::to_string(&definition).unwrap(),
    )
    .unwrap();

    let output = pdbjob()
        .args(["submit", "job.json", "--scheduler", "local", "--no-preflight"])
        .current_dir(&dir)
        .env("RUST_LOG", "info")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Submitted batch job"));
    assert!(stdout.contains("local-"));
    assert!(stdout.contains(&dir.join("work/logs").display().to_string()));

    let logs: Vec<PathBuf> = fs::read_dir(dir.join("work/logs"))
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(logs.len(), 1);

    let log = fs::read_to_string(&logs[0]).unwrap();
    assert!(log.lines().any(|line| line == TOOL_LINE));
    assert_eq!(log.lines().last(), Some("Done"));
    assert!(!log.contains('\x1b'));
}

#[test]
fn test_local_submit_surfaces_tool_failure() {
    let dir = scratch_dir("submit-local-fail");
    let definition = tool_definition(&dir, "exit 5\n");
    fs::write(
        dir.join("job.json"),
        serde_json::to_string(&definition).unwrap(),
    )
    .unwrap();

    let output = pdbjob()
        .args(["submit", "job.json", "--scheduler", "local", "--no-preflight"])
        .current_dir(&dir)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(5));
    assert!(!String::from_utf8_lossy(&output.stdout).contains("Submitted batch job"));

    let logs: Vec<PathBuf> = fs::read_dir(dir.join("logs"))
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    let log = fs::read_to_string(&logs[0]).unwrap();
    assert_eq!(log.lines().last(), Some("Failed (exit status 5)"));
}
