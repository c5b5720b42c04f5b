//! Mutating command execution and outcome classification

use helmsync_core::{Action, CommandPlan, ReleaseDescriptor, ReleaseStatus};
use serde::Deserialize;

use crate::error::{EngineError, Result};
use crate::runner::{ProcessRunner, invoke};

const ROLLBACK_MARKERS: &[&str] = &["Rollback was a success"];
const UNINSTALL_MARKERS: &[&str] = &["uninstalled", "deleted"];

/// Stdout markers confirming `action` when its command has no structured output
fn success_markers(action: Action) -> &'static [&'static str] {
    match action {
        Action::Rollback { .. } => ROLLBACK_MARKERS,
        Action::Delete => UNINSTALL_MARKERS,
        _ => &[],
    }
}

/// How an executed command ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Reached an accepted state
    Changed,
    /// Dry run; nothing was mutated
    DryRun,
    /// Non-zero exit
    Failed,
    /// Exit 0, but the release is not in an accepted state
    Unaccepted { status: String },
    /// Exit 0, but the structured output could not be parsed
    Malformed { message: String },
}

/// Result of running one mutating plan
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub verdict: Verdict,
    /// Parsed release, for structured commands that succeeded
    pub release: Option<ReleaseDescriptor>,
}

impl ExecutionOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self.verdict,
            Verdict::Failed | Verdict::Unaccepted { .. } | Verdict::Malformed { .. }
        )
    }

    /// The error this outcome amounts to, if it is a failure
    pub fn error(&self, command: &str) -> Option<EngineError> {
        let command = command.to_string();
        match &self.verdict {
            Verdict::Changed | Verdict::DryRun => None,
            Verdict::Failed => Some(EngineError::CommandFailed {
                command,
                exit_code: self.exit_code,
                stderr: self.stderr.trim().to_string(),
            }),
            Verdict::Unaccepted { status } => Some(EngineError::UnacceptedStatus {
                command,
                status: status.clone(),
            }),
            Verdict::Malformed { message } => Some(EngineError::MalformedOutput {
                command,
                message: message.clone(),
            }),
        }
    }
}

/// Runs mutating plans and classifies what happened
pub struct CommandExecutor<'a, R: ?Sized> {
    runner: &'a R,
}

impl<'a, R: ProcessRunner + ?Sized> CommandExecutor<'a, R> {
    pub fn new(runner: &'a R) -> Self {
        Self { runner }
    }

    /// Run the plan of `action` once. Only a failure to start the process is an `Err`.
    pub fn execute(&self, action: Action, plan: &CommandPlan) -> Result<ExecutionOutcome> {
        let output = invoke(self.runner, plan)?;

        let (verdict, release) = if !output.is_success() {
            (Verdict::Failed, None)
        } else if plan.is_dry_run() {
            (Verdict::DryRun, None)
        } else if plan.structured_output() {
            classify_structured(&output.stdout)
        } else {
            (classify_text(&output.stdout, success_markers(action)), None)
        };

        tracing::info!(command = %plan.command_line(), verdict = ?verdict, "executed");

        Ok(ExecutionOutcome {
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
            verdict,
            release,
        })
    }
}

fn classify_structured(stdout: &str) -> (Verdict, Option<ReleaseDescriptor>) {
    let raw: RawRelease = match serde_json::from_str(stdout) {
        Ok(raw) => raw,
        Err(e) => {
            return (
                Verdict::Malformed {
                    message: e.to_string(),
                },
                None,
            );
        }
    };

    let descriptor = raw.into_descriptor();
    let verdict = match ReleaseStatus::from_raw(&descriptor.status) {
        ReleaseStatus::Deployed | ReleaseStatus::PendingInstall | ReleaseStatus::PendingUpgrade => {
            Verdict::Changed
        }
        _ => Verdict::Unaccepted {
            status: descriptor.status.clone(),
        },
    };
    (verdict, Some(descriptor))
}

fn classify_text(stdout: &str, markers: &[&str]) -> Verdict {
    if markers.iter().any(|m| stdout.contains(m)) {
        Verdict::Changed
    } else {
        Verdict::Unaccepted {
            status: match stdout.trim() {
                "" => "no confirmation in output".to_string(),
                other => other.to_string(),
            },
        }
    }
}

#[derive(Deserialize)]
struct RawRelease {
    name: String,
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    version: Option<u32>,
    info: RawInfo,
    #[serde(default)]
    chart: Option<RawChart>,
    #[serde(default)]
    manifest: Option<String>,
}

#[derive(Deserialize)]
struct RawInfo {
    status: RawStatus,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStatus {
    Text(String),
    Coded {
        code: i64,
        #[serde(default)]
        notes: Option<String>,
    },
}

#[derive(Deserialize)]
struct RawChart {
    #[serde(default)]
    metadata: Option<RawMetadata>,
}

#[derive(Deserialize)]
struct RawMetadata {
    #[serde(default)]
    version: Option<String>,
}

impl RawRelease {
    fn into_descriptor(self) -> ReleaseDescriptor {
        let (status, legacy_notes) = match self.info.status {
            RawStatus::Text(status) => (status, None),
            RawStatus::Coded { code, notes } => {
                tracing::warn!(code, "release status uses the legacy numeric format");
                (legacy_status(code).to_string(), notes)
            }
        };

        ReleaseDescriptor {
            name: self.name,
            namespace: self.namespace,
            revision: self.version,
            status,
            chart_version: self.chart.and_then(|c| c.metadata).and_then(|m| m.version),
            notes: self.info.notes.or(legacy_notes),
            manifest: self.manifest,
        }
    }
}

/// Numeric status codes of the older release format
fn legacy_status(code: i64) -> &'static str {
    match code {
        1 => "deployed",
        2 => "deleted",
        3 => "superseded",
        4 => "failed",
        5 => "deleting",
        6 => "pending-install",
        7 => "pending-upgrade",
        8 => "pending-rollback",
        _ => "unknown",
    }
}
