//! Process execution
//!
//! The engine never spawns processes itself; every external invocation goes
//! through a [`ProcessRunner`]. helmsync ships two runners:
//! - **System**: spawns the real binary and blocks until it exits
//! - **Scripted**: replays canned responses and records invocations (for tests)

mod scripted;

pub use scripted::{RecordedCall, ScriptedRunner};

use helmsync_core::CommandPlan;
use std::process::{Command, Stdio};

use crate::error::{EngineError, Result};

/// Exit status and captured output of one process
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// Exit 0 with the given stdout
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Non-zero exit with the given stderr
    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Executes a command plan and reports what the process did.
///
/// Implementations block the calling thread until the process exits and
/// must be `Send + Sync` so independent reconciliations can run on separate
/// threads. An `Err` means the process could not be started at all.
pub trait ProcessRunner: Send + Sync {
    fn run(&self, plan: &CommandPlan) -> std::io::Result<ProcessOutput>;
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for &R {
    fn run(&self, plan: &CommandPlan) -> std::io::Result<ProcessOutput> {
        (**self).run(plan)
    }
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for Box<R> {
    fn run(&self, plan: &CommandPlan) -> std::io::Result<ProcessOutput> {
        (**self).run(plan)
    }
}

/// Run `plan`, turning a failure to start the process into [`EngineError::Spawn`]
pub(crate) fn invoke<R: ProcessRunner + ?Sized>(runner: &R, plan: &CommandPlan) -> Result<ProcessOutput> {
    tracing::debug!(command = %plan.command_line(), "running");
    let output = runner.run(plan).map_err(|source| EngineError::Spawn {
        program: plan.program().to_string(),
        source,
    })?;
    tracing::debug!(exit_code = output.exit_code, "finished");
    Ok(output)
}

/// Runs plans as real child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, plan: &CommandPlan) -> std::io::Result<ProcessOutput> {
        let output = Command::new(plan.program())
            .args(plan.args())
            .stdin(Stdio::null())
            .output()?;

        Ok(ProcessOutput {
            // Killed by a signal: no exit code
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
