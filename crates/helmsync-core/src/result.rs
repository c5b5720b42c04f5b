//! Reconciliation results

use serde::{Deserialize, Serialize};

use crate::plan::Action;

/// Outcome of one reconciliation call.
///
/// Built once through one of the constructors and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResult {
    changed: bool,
    failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    action: Option<Action>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw_output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    command_line: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    release: Option<ReleaseDescriptor>,
}

impl ReconciliationResult {
    /// Nothing to do; no command was issued
    pub fn unchanged(action: Action, message: impl Into<String>) -> Self {
        Self {
            changed: false,
            failed: false,
            action: Some(action),
            message: message.into(),
            raw_output: None,
            command_line: None,
            release: None,
        }
    }

    /// A mutating command was issued and reached an accepted state
    pub fn changed(
        action: Action,
        message: impl Into<String>,
        command_line: String,
        raw_output: String,
        release: Option<ReleaseDescriptor>,
    ) -> Self {
        Self {
            changed: true,
            failed: false,
            action: Some(action),
            message: message.into(),
            raw_output: Some(raw_output),
            command_line: Some(command_line),
            release,
        }
    }

    /// A dry-run command was issued; nothing changed
    pub fn dry_run(
        action: Action,
        message: impl Into<String>,
        command_line: String,
        raw_output: String,
    ) -> Self {
        Self {
            changed: false,
            failed: false,
            action: Some(action),
            message: message.into(),
            raw_output: Some(raw_output),
            command_line: Some(command_line),
            release: None,
        }
    }

    /// The call failed; `action` is absent when it failed before a decision
    pub fn failed(
        action: Option<Action>,
        message: impl Into<String>,
        command_line: Option<String>,
        raw_output: Option<String>,
    ) -> Self {
        Self {
            changed: false,
            failed: true,
            action,
            message: message.into(),
            raw_output,
            command_line,
            release: None,
        }
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn action(&self) -> Option<Action> {
        self.action
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Raw stdout (or stderr on failure) of the issued command
    pub fn raw_output(&self) -> Option<&str> {
        self.raw_output.as_deref()
    }

    /// The issued command line, secrets masked
    pub fn command_line(&self) -> Option<&str> {
        self.command_line.as_deref()
    }

    /// Parsed release descriptor, for structured mutating commands
    pub fn release(&self) -> Option<&ReleaseDescriptor> {
        self.release.as_ref()
    }
}

/// Release as described by the structured output of install/upgrade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseDescriptor {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub revision: Option<u32>,
    /// Raw status string
    pub status: String,
    #[serde(default)]
    pub chart_version: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub manifest: Option<String>,
}

impl ReleaseDescriptor {
    /// Rendered manifest followed by the release notes
    pub fn prepared_diff(&self) -> String {
        let manifest = self.manifest.as_deref().unwrap_or_default();
        let notes = self.notes.as_deref().unwrap_or_default();
        format!("{}\n{}", manifest, notes)
    }
}
