//! Result reporting
//!
//! Turns decisions, execution outcomes and errors into
//! [`ReconciliationResult`]s. Nothing here performs I/O; the same inputs
//! always produce the same message.

use helmsync_core::{Action, CommandPlan, Lifecycle, ReconciliationResult, ReleaseSpec};

use crate::error::EngineError;
use crate::executor::{ExecutionOutcome, Verdict};

/// Builds results for one release spec
#[derive(Debug, Clone, Copy)]
pub struct ResultReporter<'a> {
    spec: &'a ReleaseSpec,
}

impl<'a> ResultReporter<'a> {
    pub fn new(spec: &'a ReleaseSpec) -> Self {
        Self { spec }
    }

    /// Nothing to do
    pub fn noop(&self) -> ReconciliationResult {
        let message = if self.spec.state == Lifecycle::Absent {
            format!("Release \"{}\" is already absent", self.spec.deploy_name)
        } else {
            format!(
                "Release \"{}\" is already at version {}",
                self.spec.deploy_name,
                self.version()
            )
        };
        ReconciliationResult::unchanged(Action::NoOp, message)
    }

    /// Map an execution outcome
    pub fn outcome(
        &self,
        action: Action,
        plan: &CommandPlan,
        outcome: &ExecutionOutcome,
    ) -> ReconciliationResult {
        let command_line = plan.command_line();

        if let Some(err) = outcome.error(&command_line) {
            let raw = match outcome.verdict {
                Verdict::Failed => &outcome.stderr,
                _ => &outcome.stdout,
            };
            return ReconciliationResult::failed(
                Some(action),
                self.failure_message(action, &err),
                Some(command_line),
                Some(raw.clone()),
            );
        }

        if outcome.verdict == Verdict::DryRun {
            return ReconciliationResult::dry_run(
                action,
                format!("Would {}", self.describe(action, false)),
                command_line,
                outcome.stdout.clone(),
            );
        }

        ReconciliationResult::changed(
            action,
            self.describe(action, true),
            command_line,
            outcome.stdout.clone(),
            outcome.release.clone(),
        )
    }

    /// Map an error; `action` is `None` when it happened before a decision
    pub fn error(&self, action: Option<Action>, err: &EngineError) -> ReconciliationResult {
        let message = match action {
            Some(action) => self.failure_message(action, err),
            None => err.to_string(),
        };
        ReconciliationResult::failed(action, message, err.command_line().map(str::to_string), None)
    }

    fn failure_message(&self, action: Action, err: &EngineError) -> String {
        format!("Failed to {}: {}", self.describe(action, false), err)
    }

    /// Sentence fragment for `action`, past tense when `done`
    fn describe(&self, action: Action, done: bool) -> String {
        let chart = &self.spec.chart.name;
        let version = self.version();
        let tense = |past: &str, present: &str| if done { past.to_string() } else { present.to_string() };

        match action {
            Action::NoOp => format!("leave release \"{}\" unchanged", self.spec.deploy_name),
            Action::Install => format!("{} chart {}, version {}", tense("Installed", "install"), chart, version),
            Action::Reinstall => format!(
                "{} (previously deleted) chart {}, version {}",
                tense("Re-installed", "re-install"),
                chart,
                version
            ),
            Action::Upgrade => format!("{} chart {} to version {}", tense("Upgraded", "upgrade"), chart, version),
            Action::Rollback { target_revision } => format!(
                "{} chart {} to version {}, revision {}",
                tense("Rolled back", "roll back"),
                chart,
                version,
                target_revision
            ),
            Action::Delete => format!("{} chart {}", tense("Deleted", "delete"), self.spec.deploy_name),
        }
    }

    /// Desired version for messages; wildcards render as `latest`
    fn version(&self) -> String {
        match self.spec.desired_version() {
            Ok(version) => version.to_string(),
            Err(_) => self.spec.version.clone().unwrap_or_default(),
        }
    }
}
