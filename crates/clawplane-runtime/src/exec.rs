//! One-shot process execution with a hard timeout.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::command::BuiltCommand;

#[cfg(unix)]
const EPERM: i32 = 1;

/// Why a process could not be started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartFailureKind {
    NotFound,
    PermissionDenied,
    NotPermitted,
    Other,
}

impl StartFailureKind {
    pub fn from_io(err: &io::Error) -> Self {
        if is_eperm(err) {
            return Self::NotPermitted;
        }
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::Other,
        }
    }
}

#[cfg(unix)]
fn is_eperm(err: &io::Error) -> bool {
    err.raw_os_error() == Some(EPERM)
}

#[cfg(not(unix))]
fn is_eperm(_err: &io::Error) -> bool {
    false
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to run `{program}`: {source}")]
    Start {
        program: String,
        kind: StartFailureKind,
        #[source]
        source: io::Error,
    },
    #[error("command timed out after {}ms", .timeout.as_millis())]
    Timeout { timeout: Duration },
}

impl ExecError {
    pub fn start(program: impl Into<String>, source: io::Error) -> Self {
        Self::Start {
            program: program.into(),
            kind: StartFailureKind::from_io(&source),
            source,
        }
    }
}

/// Captured result of a process that ran to completion. A non-zero
/// `exit_code` is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration: Duration,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Exit code, or -1 when the process was killed by a signal.
pub fn exit_code(status: &ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    async fn execute(
        &self,
        command: &BuiltCommand,
        timeout: Duration,
    ) -> Result<ProcessOutput, ExecError>;
}

/// Runs commands as real child processes on the tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeExecutor;

#[async_trait]
impl ProcessExecutor for NativeExecutor {
    async fn execute(
        &self,
        command: &BuiltCommand,
        timeout: Duration,
    ) -> Result<ProcessOutput, ExecError> {
        let started = Instant::now();
        let mut cmd = command.to_command();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd
            .spawn()
            .map_err(|source| ExecError::start(command.program(), source))?;
        let pid = child.id();

        // Dropping the wait future on timeout drops the child, which kills it.
        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(ProcessOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_code: exit_code(&output.status),
                duration: started.elapsed(),
            }),
            Ok(Err(source)) => Err(ExecError::start(command.program(), source)),
            Err(_) => {
                kill_process_group(pid);
                Err(ExecError::Timeout { timeout })
            }
        }
    }
}

/// The child leads its own process group, so this also reaches whatever it
/// started (the CLI under `sh -c`, for one).
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    let Some(pid) = pid.and_then(|pid| i32::try_from(pid).ok()) else {
        return;
    };
    unsafe {
        libc::kill(-pid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}
