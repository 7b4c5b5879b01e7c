use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::error::ToolError;

/// Cancellation and deadline handed to every external tool run.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub cancel: CancellationToken,
    pub timeout: Option<Duration>,
}

impl Invocation {
    pub fn new(cancel: CancellationToken, timeout: Option<Duration>) -> Self {
        Self { cancel, timeout }
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Turn a non-zero exit into [`ToolError::Failed`].
    pub fn check(self, program: &str) -> Result<Self, ToolError> {
        if self.success() {
            Ok(self)
        } else {
            Err(ToolError::Failed {
                program: program.to_string(),
                exit_code: self.exit_code,
                stderr: self.stderr,
            })
        }
    }
}

/// Run `command` to completion, capturing its output.
///
/// The child is killed if the invocation is cancelled, its deadline passes,
/// or the returned future is dropped.
pub async fn run_command(mut command: Command, invocation: &Invocation) -> Result<ProcessOutput, ToolError> {
    let program = command.as_std().get_program().to_string_lossy().into_owned();
    tracing::debug!(command = ?command.as_std(), "Spawning external tool");

    let child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ToolError::Launch {
            program: program.clone(),
            source,
        })?;

    let wait = async {
        let output = match invocation.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| ToolError::TimedOut {
                    program: program.clone(),
                    limit,
                })?,
            None => child.wait_with_output().await,
        };
        output.map_err(|source| ToolError::Io {
            program: program.clone(),
            source,
        })
    };

    let output = tokio::select! {
        biased;
        _ = invocation.cancel.cancelled() => {
            return Err(ToolError::Cancelled { program: program.clone() });
        }
        output = wait => output?,
    };

    let output = ProcessOutput {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };
    tracing::debug!(
        program = %program,
        exit_code = ?output.exit_code,
        stdout = %output.stdout,
        stderr = %output.stderr,
        "External tool finished"
    );
    Ok(output)
}
