use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::error::ProcessError;

/// Captured result of an external process that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// The exit code, or [None] if the process was terminated by a signal
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs an external command and captures its output.
///
/// The benchmark invoker only talks to this trait so that tests can replace the real benchmark
/// tool with canned reports.
pub trait ProcessInvoker: Send + Sync {
    fn run(
        &self,
        command: &Path,
        args: &[String],
        timeout: Duration,
    ) -> impl Future<Output = Result<ProcessOutput, ProcessError>> + Send;
}

/// Runs commands as [tokio] child processes.
///
/// A process that outlives its timeout is killed, as is a process whose future is dropped, for
/// example because the run was cancelled.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessInvoker;

impl ProcessInvoker for TokioProcessInvoker {
    async fn run(
        &self,
        command: &Path,
        args: &[String],
        timeout: Duration,
    ) -> Result<ProcessOutput, ProcessError> {
        let command_line = format!("{} {}", command.display(), args.join(" "));
        log::debug!("Running '{command_line}'");

        let child = Command::new(command)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                command: command_line.clone(),
                source,
            })?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                return Err(ProcessError::Spawn {
                    command: command_line,
                    source,
                })
            }
            // Dropping the wait future drops the child, which kills it.
            Err(_) => {
                return Err(ProcessError::TimedOut {
                    command: command_line,
                    timeout,
                })
            }
        };

        Ok(ProcessOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sh(script: &str) -> (PathBuf, Vec<String>) {
        (
            PathBuf::from("/bin/sh"),
            vec!["-c".to_string(), script.to_string()],
        )
    }

    #[tokio::test]
    async fn captures_stdout_stderr_and_exit_code() {
        let (command, args) = sh("echo report; echo oops >&2; exit 3");

        let output = TokioProcessInvoker
            .run(&command, &args, Duration::from_secs(10))
            .await
            .unwrap();

        assert_eq!(output.stdout.trim(), "report");
        assert_eq!(output.stderr.trim(), "oops");
        assert_eq!(output.exit_code, Some(3));
        assert!(!output.success());
    }

    #[tokio::test]
    async fn hung_process_times_out() {
        let (command, args) = sh("sleep 30");

        let result = TokioProcessInvoker
            .run(&command, &args, Duration::from_millis(100))
            .await;

        assert!(matches!(result, Err(ProcessError::TimedOut { .. })));
    }

    #[tokio::test]
    async fn missing_binary_fails_to_spawn() {
        let result = TokioProcessInvoker
            .run(
                Path::new("/non/existent/path/to/ab"),
                &[],
                Duration::from_secs(1),
            )
            .await;

        assert!(matches!(result, Err(ProcessError::Spawn { .. })));
    }
}
