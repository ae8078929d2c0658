//! Tool invocation
//!
//! Runs the conversion tool as `<interpreter> <script> <args...>` and waits
//! for it. Output is streamed line by line into the transcript while the
//! tool runs: stdout at info level, stderr at error level.

use pdbjob_core::{InvocationSpec, LogEntry, LogLevel, ToolExit, ToolSpec};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::environment::ActivatedEnvironment;
use crate::transcript::Transcript;

/// Starts the external tool and reports how it ended
#[derive(Debug, Clone, Default)]
pub struct ToolInvoker {}

impl ToolInvoker {
    pub fn new() -> Self {
        Self {}
    }

    /// Builds the command without running it
    pub fn command(
        &self,
        tool: &ToolSpec,
        spec: &InvocationSpec,
        environment: &ActivatedEnvironment,
        working_dir: Option<&Path>,
    ) -> Command {
        let mut command = Command::new(&tool.interpreter);
        command.arg(&tool.script).args(spec.to_args());
        environment.apply(&mut command);

        if let Some(dir) = working_dir {
            command.current_dir(dir);
        }

        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }

    /// Runs the tool to completion
    ///
    /// Never fails: a tool that cannot be started is reported as
    /// [`ToolExit::SpawnFailed`] with the reason in the transcript.
    pub async fn invoke(
        &self,
        tool: &ToolSpec,
        spec: &InvocationSpec,
        environment: &ActivatedEnvironment,
        working_dir: Option<&Path>,
        transcript: Arc<dyn Transcript>,
    ) -> ToolExit {
        let mut command = self.command(tool, spec, environment, working_dir);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                transcript.error(format!("Failed to start {}: {}", tool.interpreter, e));
                return ToolExit::SpawnFailed;
            }
        };

        debug!("Tool started with pid {:?}", child.id());

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (status, stdout_result, stderr_result) = tokio::join!(
            child.wait(),
            forward_lines(stdout, LogLevel::Info, transcript.clone()),
            forward_lines(stderr, LogLevel::Error, transcript.clone()),
        );

        for result in [stdout_result, stderr_result] {
            if let Err(e) = result {
                warn!("Lost part of the tool output: {}", e);
            }
        }

        match status {
            Ok(status) => tool_exit(status),
            Err(e) => {
                transcript.error(format!("Failed to wait for {}: {}", tool.interpreter, e));
                ToolExit::Exited(1)
            }
        }
    }
}

/// Copies a child stream into the transcript, one entry per line
///
/// Bytes are decoded lossily so a stray non-UTF-8 byte never stops the copy
/// and blocks the child on a full pipe.
async fn forward_lines<R>(
    reader: Option<R>,
    level: LogLevel,
    transcript: Arc<dyn Transcript>,
) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return Ok(());
    };

    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(());
        }

        let text = String::from_utf8_lossy(&line);
        let text = text.trim_end_matches(['\n', '\r']);
        transcript.add_entry(LogEntry::now(level, text));
    }
}

/// Maps a process exit status to a tool exit
pub(crate) fn tool_exit(status: ExitStatus) -> ToolExit {
    if let Some(code) = status.code() {
        return ToolExit::Exited(code);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return ToolExit::Signaled(signal);
        }
    }

    ToolExit::Exited(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{scratch_dir, write_file};
    use crate::transcript::InMemoryTranscript;
    use pdbjob_core::SelectionMode;
    use std::path::PathBuf;

    fn sh_tool(dir: &Path, body: &str) -> ToolSpec {
        let script = dir.join("tool.sh");
        write_file(&script, body);
        ToolSpec {
            interpreter: "sh".to_string(),
            script,
        }
    }

    #[test]
    fn test_command_line() {
        let tool = ToolSpec::default();
        let command = ToolInvoker::new().command(
            &tool,
            &InvocationSpec::default(),
            &ActivatedEnvironment::inherited(),
            None,
        );

        let std_command = command.as_std();
        assert_eq!(std_command.get_program(), "python");

        let args: Vec<String> = std_command
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "src/data/processing/h5_to_pdb.py",
                "-s",
                "all",
                "-dMD",
                "data/MD/h5_files/MD.hdf5",
                "-mdir",
                "src/data/processing/Maps/",
            ]
        );
    }

    #[tokio::test]
    async fn test_streams_output_and_reports_status() {
        let dir = scratch_dir("invoker");
        let tool = sh_tool(&dir, "echo \"args: $*\"\necho oops >&2\nexit 3\n");
        let transcript = InMemoryTranscript::new();

        let exit = ToolInvoker::new()
            .invoke(
                &tool,
                &InvocationSpec::default(),
                &ActivatedEnvironment::inherited(),
                None,
                Arc::new(transcript.clone()),
            )
            .await;

        assert_eq!(exit, ToolExit::Exited(3));

        let entries = transcript.snapshot();
        let stdout: Vec<&LogEntry> = entries
            .iter()
            .filter(|e| e.level == LogLevel::Info)
            .collect();
        assert_eq!(stdout.len(), 1);
        assert_eq!(
            stdout[0].message,
            "args: -s all -dMD data/MD/h5_files/MD.hdf5 -mdir src/data/processing/Maps/"
        );
        assert!(
            entries
                .iter()
                .any(|e| e.level == LogLevel::Error && e.message == "oops")
        );
    }

    #[tokio::test]
    async fn test_environment_and_working_dir_reach_tool() {
        let dir = scratch_dir("invoker-env");
        let tool = sh_tool(&dir, "echo \"$CONDA_DEFAULT_ENV\"\npwd\n");
        let transcript = InMemoryTranscript::new();

        let environment = ActivatedEnvironment {
            prefix: None,
            set: vec![("CONDA_DEFAULT_ENV".to_string(), "misato".into())],
            unset: vec![],
        };

        let spec = InvocationSpec {
            selection: SelectionMode::Structure("11gs".to_string()),
            ..InvocationSpec::default()
        };

        let exit = ToolInvoker::new()
            .invoke(
                &tool,
                &spec,
                &environment,
                Some(&dir),
                Arc::new(transcript.clone()),
            )
            .await;

        assert!(exit.success());
        let messages = transcript.messages();
        assert_eq!(messages[0], "misato");
        assert_eq!(
            PathBuf::from(&messages[1]).canonicalize().unwrap(),
            dir.canonicalize().unwrap()
        );
    }

    #[tokio::test]
    async fn test_missing_interpreter() {
        let tool = ToolSpec {
            interpreter: "/nonexistent/python".to_string(),
            script: PathBuf::from("h5_to_pdb.py"),
        };
        let transcript = InMemoryTranscript::new();

        let exit = ToolInvoker::new()
            .invoke(
                &tool,
                &InvocationSpec::default(),
                &ActivatedEnvironment::inherited(),
                None,
                Arc::new(transcript.clone()),
            )
            .await;

        assert_eq!(exit, ToolExit::SpawnFailed);
        assert!(transcript.messages()[0].contains("/nonexistent/python"));
    }

    #[tokio::test]
    async fn test_signal_is_reported() {
        let dir = scratch_dir("invoker-signal");
        let tool = sh_tool(&dir, "kill -9 $$\n");
        let transcript = InMemoryTranscript::new();

        let exit = ToolInvoker::new()
            .invoke(
                &tool,
                &InvocationSpec::default(),
                &ActivatedEnvironment::inherited(),
                None,
                Arc::new(transcript.clone()),
            )
            .await;

        assert_eq!(exit, ToolExit::Signaled(9));
        assert_eq!(exit.status_code(), 137);
    }
}
