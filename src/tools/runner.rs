//! Process execution on the host via `tokio::process`.

use super::{Invocation, OutputMode, ToolOutput, ToolRunner};
use crate::BoxFuture;
use crate::cli::OutputManager;
use crate::error::{Result, ToolError};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

/// Runs invocations as child processes of this process
///
/// Streamed output is forwarded line by line through the [`OutputManager`].
/// Children are spawned with `kill_on_drop`, so a dropped build future never
/// leaves an orphaned tool behind.
#[derive(Debug, Clone, Default)]
pub struct SystemToolRunner {
    output: OutputManager,
}

impl SystemToolRunner {
    /// Create a runner that streams through `output`
    pub fn new(output: OutputManager) -> Self {
        Self { output }
    }

    async fn run_streamed(&self, mut command: Command, invocation: &Invocation) -> Result<ToolOutput> {
        let mut child = command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|error| spawn_error(invocation, error))?;

        // Drain stderr concurrently with stdout
        let stderr_handle = child.stderr.take().map(|stderr| {
            let output = self.output.clone();
            tokio::spawn(async move { forward_lines(stderr, &output).await })
        });

        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, &self.output).await;
        }

        let status = child
            .wait()
            .await
            .map_err(|error| spawn_error(invocation, error))?;

        if let Some(handle) = stderr_handle {
            handle.await?;
        }

        Ok(ToolOutput {
            code: status.code(),
            success: status.success(),
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

impl ToolRunner for SystemToolRunner {
    fn run<'a>(&'a self, invocation: &'a Invocation) -> BoxFuture<'a, Result<ToolOutput>> {
        Box::pin(async move {
            log::debug!("[{}] {}", invocation.label(), invocation.command_line());

            let mut command = Command::new(invocation.program());
            command
                .args(invocation.arguments())
                .stdin(Stdio::null())
                .kill_on_drop(true);

            match invocation.output_mode() {
                OutputMode::Stream => return self.run_streamed(command, invocation).await,
                OutputMode::Silent => {
                    command.stdout(Stdio::null()).stderr(Stdio::piped());
                }
                OutputMode::Capture => {
                    command.stdout(Stdio::piped()).stderr(Stdio::piped());
                }
            }

            let output = command
                .output()
                .await
                .map_err(|error| spawn_error(invocation, error))?;

            Ok(ToolOutput {
                code: output.status.code(),
                success: output.status.success(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        })
    }
}

/// Forward `reader` to `output` line by line until end of stream
///
/// Bytes that are not UTF-8 are replaced rather than ending the stream, so the
/// child never blocks on a pipe nobody reads. Returns the number of lines seen.
async fn forward_lines<R: AsyncRead + Unpin>(reader: R, output: &OutputManager) -> usize {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut count = 0;
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                output.indent(line.trim_end_matches(['\r', '\n']));
                count += 1;
            }
            Err(e) => {
                log::warn!("Stopped reading tool output: {e}");
                break;
            }
        }
    }
    count
}

fn spawn_error(invocation: &Invocation, error: std::io::Error) -> crate::BuildError {
    ToolError::Spawn {
        tool: format!("{} ({})", invocation.label(), invocation.program().display()),
        error,
    }
    .into()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::BuildError;

    fn runner() -> SystemToolRunner {
        SystemToolRunner::new(OutputManager::new(true))
    }

    #[tokio::test]
    async fn capture_returns_stdout_and_exit_code() {
        let invocation = Invocation::new("sh", "sh")
            .args(["-c", "echo 19.16.39; echo warn >&2; exit 3"])
            .mode(OutputMode::Capture);

        let output = runner().run(&invocation).await.unwrap();
        assert_eq!(output.code, Some(3));
        assert!(!output.success);
        assert_eq!(output.stdout.trim(), "19.16.39");
        assert_eq!(output.stderr.trim(), "warn");
    }

    #[tokio::test]
    async fn silent_discards_stdout_but_keeps_stderr() {
        let invocation = Invocation::new("sh", "sh")
            .args(["-c", "echo noise; echo broken >&2; exit 1"])
            .mode(OutputMode::Silent);

        let output = runner().run(&invocation).await.unwrap();
        assert!(output.stdout.is_empty());

        let err = output.check("merge tool").unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[tokio::test]
    async fn streamed_success_reports_status() {
        let invocation = Invocation::new("sh", "sh").args(["-c", "echo one; echo two >&2"]);
        let output = runner().run(&invocation).await.unwrap();
        assert!(output.success);
        assert_eq!(output.code, Some(0));
    }

    #[tokio::test]
    async fn invalid_utf8_lines_keep_streaming() {
        let output = OutputManager::new(true);
        let count = forward_lines(&b"caf\xe9 ok\n\xff\xfe\r\nlast line"[..], &output).await;
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn streamed_binary_output_does_not_stall_child() {
        // A bad byte followed by more output than a pipe buffer holds
        let invocation = Invocation::new("sh", "sh").args([
            "-c",
            "printf '\\377\\n'; i=0; while [ $i -lt 20000 ]; do echo padding-line-$i; i=$((i+1)); done; exit 4",
        ]);
        let output = runner().run(&invocation).await.unwrap();
        assert_eq!(output.code, Some(4));
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let invocation = Invocation::new("ghost", "/nonexistent/ghost-tool");
        let err = runner().run(&invocation).await.unwrap_err();
        assert!(matches!(err, BuildError::Tool(ToolError::Spawn { .. })));
    }
}
