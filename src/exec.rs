//! Running a confirmed command through the system shell.

use async_trait::async_trait;
use std::io;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

/// Outcome of one finished command, with both streams fully captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Failures that prevent a command from producing a result. A shell that
/// starts but cannot find the program still produces one, with its own exit
/// status and message.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("command not found: {program}")]
    CommandNotFound { program: String, detail: String },

    #[error("failed to run command: {0}")]
    Unexpected(#[from] io::Error),
}

/// Something that can run a shell command line.
#[async_trait]
pub trait Executor {
    async fn run(&self, command: &str) -> Result<ExecutionResult, ExecError>;
}

/// Runs commands as `<shell> -c <command>` (`cmd /C` on Windows).
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: String,
}

impl ShellExecutor {
    pub fn new(shell: Option<String>) -> Self {
        Self {
            shell: shell.unwrap_or_else(default_shell),
        }
    }

    fn command(&self, line: &str) -> Command {
        let mut command = Command::new(&self.shell);
        if cfg!(windows) {
            command.arg("/C");
        } else {
            command.arg("-c");
        }
        command.arg(line);
        command
    }
}

fn default_shell() -> String {
    let shell = if cfg!(windows) { "cmd" } else { "sh" };
    shell.to_string()
}

#[async_trait]
impl Executor for ShellExecutor {
    async fn run(&self, line: &str) -> Result<ExecutionResult, ExecError> {
        debug!(shell = %self.shell, command = line, "spawning");
        let output = self
            .command(line)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => ExecError::CommandNotFound {
                    program: self.shell.clone(),
                    detail: err.to_string(),
                },
                _ => ExecError::Unexpected(err),
            })?;

        let result = ExecutionResult {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        info!(exit_code = result.exit_code, "command finished");
        Ok(result)
    }
}
