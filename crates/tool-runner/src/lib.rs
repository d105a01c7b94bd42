//! External tool runner
//!
//! All heavy computation is delegated to external binaries (ffmpeg, COLMAP,
//! the training script). This crate abstracts their invocation behind the
//! [`ToolRunner`] trait so pipeline stages can be tested against
//! deterministic stubs instead of real GPU/CV tools. The subprocess
//! implementation streams stdout line by line, which the trainer scrapes for
//! iteration progress.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

/// Errors from invoking an external tool
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} exited with {code_desc}: {stderr}")]
    NonZeroExit {
        program: String,
        code: Option<i32>,
        code_desc: String,
        stderr: String,
    },

    #[error("io error while running {program}: {source}")]
    Io {
        program: String,
        source: std::io::Error,
    },
}

/// A single external tool invocation
#[derive(Debug, Clone)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl ToolCommand {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Render the command line for logging
    #[must_use]
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Captured output of a completed tool invocation
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs external tools; exit code and stderr are the observed contract
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run the command, invoking `on_line` for every stdout line as it
    /// arrives. Returns the captured output on a zero exit.
    async fn run_with_output_lines(
        &self,
        command: ToolCommand,
        on_line: &(dyn for<'a> Fn(&'a str) + Send + Sync),
    ) -> Result<ToolOutput, ToolError>;

    /// Run the command to completion without observing individual lines
    async fn run(&self, command: ToolCommand) -> Result<ToolOutput, ToolError> {
        self.run_with_output_lines(command, &|_| {}).await
    }
}

/// [`ToolRunner`] backed by real subprocesses
///
/// Children are spawned with `kill_on_drop` so that dropping the invocation
/// future (the job deadline firing) also terminates the external process.
#[derive(Debug, Clone, Default)]
pub struct SubprocessRunner;

impl SubprocessRunner {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolRunner for SubprocessRunner {
    async fn run_with_output_lines(
        &self,
        command: ToolCommand,
        on_line: &(dyn for<'a> Fn(&'a str) + Send + Sync),
    ) -> Result<ToolOutput, ToolError> {
        info!("Running: {}", command.display());

        let program = command.program.clone();
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &command.cwd {
            cmd.current_dir(cwd);
        }

        let mut child = cmd.spawn().map_err(|source| ToolError::Spawn {
            program: program.clone(),
            source,
        })?;

        // Both pipes were requested above.
        let stdout_pipe = child.stdout.take().expect("stdout is piped");
        let mut stderr_pipe = child.stderr.take().expect("stderr is piped");

        let stdout_task = async {
            let mut lines = BufReader::new(stdout_pipe).lines();
            let mut collected = String::new();
            while let Some(line) = lines.next_line().await? {
                debug!("{}: {}", program, line);
                on_line(&line);
                collected.push_str(&line);
                collected.push('\n');
            }
            Ok::<String, std::io::Error>(collected)
        };

        let stderr_task = async {
            let mut collected = String::new();
            stderr_pipe.read_to_string(&mut collected).await?;
            Ok::<String, std::io::Error>(collected)
        };

        let (stdout, stderr) = tokio::try_join!(stdout_task, stderr_task).map_err(|source| {
            ToolError::Io {
                program: program.clone(),
                source,
            }
        })?;

        let status = child.wait().await.map_err(|source| ToolError::Io {
            program: program.clone(),
            source,
        })?;

        if !status.success() {
            let code = status.code();
            let code_desc = code.map_or_else(|| "signal".to_string(), |c| format!("code {c}"));
            return Err(ToolError::NonZeroExit {
                program,
                code,
                code_desc,
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(ToolOutput { stdout, stderr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_command_display() {
        let cmd = ToolCommand::new("colmap")
            .arg("mapper")
            .args(["--output_path", "sparse"]);
        assert_eq!(cmd.display(), "colmap mapper --output_path sparse");
    }

    #[tokio::test]
    async fn test_run_captures_stdout() {
        let runner = SubprocessRunner::new();
        let output = runner
            .run(ToolCommand::new("sh").args(["-c", "echo hello; echo world"]))
            .await
            .unwrap();
        assert_eq!(output.stdout, "hello\nworld\n");
    }

    #[tokio::test]
    async fn test_run_streams_lines_in_order() {
        let runner = SubprocessRunner::new();
        let seen = Mutex::new(Vec::new());
        runner
            .run_with_output_lines(
                ToolCommand::new("sh").args(["-c", "echo one; echo two; echo three"]),
                &|line| seen.lock().unwrap().push(line.to_string()),
            )
            .await
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), ["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_non_zero_exit_carries_stderr() {
        let runner = SubprocessRunner::new();
        let err = runner
            .run(ToolCommand::new("sh").args(["-c", "echo boom >&2; exit 3"]))
            .await
            .unwrap_err();
        match err {
            ToolError::NonZeroExit { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let runner = SubprocessRunner::new();
        let err = runner
            .run(ToolCommand::new("definitely-not-a-real-tool"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_current_dir_is_respected() {
        let dir = tempfile::tempdir().unwrap();
        let runner = SubprocessRunner::new();
        let output = runner
            .run(ToolCommand::new("pwd").current_dir(dir.path()))
            .await
            .unwrap();
        assert!(output.stdout.trim().ends_with(
            dir.path()
                .file_name()
                .unwrap()
                .to_str()
                .unwrap()
        ));
    }
}
