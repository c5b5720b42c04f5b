//! Reconciliation actions and the command plans that carry them out

use serde::{Deserialize, Serialize};
use std::fmt;

/// The transition chosen for one release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Action {
    /// Observed state already matches
    NoOp,
    /// First installation
    Install,
    /// Install over a deleted release that still has history
    Reinstall,
    /// Upgrade the existing release in place
    Upgrade,
    /// Return to an earlier revision
    #[serde(rename_all = "camelCase")]
    Rollback { target_revision: u32 },
    /// Remove the release
    Delete,
}

impl Action {
    /// Whether carrying out this action changes the cluster
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Self::NoOp)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoOp => write!(f, "no-op"),
            Self::Install => write!(f, "install"),
            Self::Reinstall => write!(f, "reinstall"),
            Self::Upgrade => write!(f, "upgrade"),
            Self::Rollback { target_revision } => {
                write!(f, "rollback to revision {}", target_revision)
            }
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// One external invocation: program, ordered arguments, and output mode.
///
/// Plans are immutable once built. Arguments marked secret are masked in
/// [`CommandPlan::command_line`] but passed through unchanged to the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPlan {
    program: String,
    args: Vec<String>,
    secret: Vec<bool>,
    structured_output: bool,
    dry_run: bool,
}

const REDACTED: &str = "********";

impl CommandPlan {
    /// Start building a plan for `program`
    pub fn builder(program: impl Into<String>) -> CommandPlanBuilder {
        CommandPlanBuilder {
            plan: Self {
                program: program.into(),
                args: Vec::new(),
                secret: Vec::new(),
                structured_output: false,
                dry_run: false,
            },
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments exactly as they are passed to the process
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Whether stdout is expected to be machine-parseable JSON
    pub fn structured_output(&self) -> bool {
        self.structured_output
    }

    /// Whether this is a dry-run invocation
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Whether any argument equals `token`
    pub fn contains(&self, token: &str) -> bool {
        self.args.iter().any(|a| a == token)
    }

    /// Printable command line with secrets masked and whitespace quoted
    pub fn command_line(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(quote(&self.program));
        for (arg, secret) in self.args.iter().zip(&self.secret) {
            if *secret {
                parts.push(REDACTED.to_string());
            } else {
                parts.push(quote(arg));
            }
        }
        parts.join(" ")
    }
}

impl fmt::Display for CommandPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command_line())
    }
}

fn quote(token: &str) -> String {
    if !token.is_empty() && !token.contains(|c: char| c.is_whitespace() || c == '\'' || c == '"') {
        token.to_string()
    } else {
        format!("'{}'", token.replace('\'', "'\\''"))
    }
}

/// Builder for [`CommandPlan`]
#[derive(Debug, Clone)]
pub struct CommandPlanBuilder {
    plan: CommandPlan,
}

impl CommandPlanBuilder {
    /// Append one argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.plan.args.push(arg.into());
        self.plan.secret.push(false);
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for arg in args {
            self = self.arg(arg);
        }
        self
    }

    /// Append an argument only when `condition` holds
    pub fn arg_if(self, condition: bool, arg: impl Into<String>) -> Self {
        if condition { self.arg(arg) } else { self }
    }

    /// Append an argument that must never appear in logs or results
    pub fn secret(mut self, arg: impl Into<String>) -> Self {
        self.plan.args.push(arg.into());
        self.plan.secret.push(true);
        self
    }

    /// Request machine-parseable output
    pub fn structured(mut self, structured: bool) -> Self {
        self.plan.structured_output = structured;
        self
    }

    /// Mark the plan as a dry run
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.plan.dry_run = dry_run;
        self
    }

    pub fn build(self) -> CommandPlan {
        self.plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_masks_secrets() {
        let plan = CommandPlan::builder("helm")
            .args(["repo", "add", "--username", "deploy", "--password"])
            .secret("hunter2")
            .args(["private", "https://charts.example.com"])
            .build();

        assert!(plan.contains("hunter2"));
        insta::assert_snapshot!(
            plan.command_line(),
            @"helm repo add --username deploy --password ******** private https://charts.example.com"
        );
    }

    #[test]
    fn test_command_line_quotes_whitespace() {
        let plan = CommandPlan::builder("helm")
            .args(["install", "app", "/charts/my app"])
            .arg_if(false, "--dry-run")
            .build();

        assert_eq!(plan.command_line(), "helm install app '/charts/my app'");
        assert!(!plan.is_dry_run());
        assert!(!plan.structured_output());
    }

    #[test]
    fn test_action_display() {
        assert_eq!(Action::Rollback { target_revision: 7 }.to_string(), "rollback to revision 7");
        assert_eq!(Action::NoOp.to_string(), "no-op");
        assert!(!Action::NoOp.is_mutating());
        assert!(Action::Delete.is_mutating());
    }

    #[test]
    fn test_action_serialization() {
        let json = serde_json::to_string(&Action::Rollback { target_revision: 3 }).unwrap();
        assert_eq!(json, r#"{"kind":"rollback","targetRevision":3}"#);
        let json = serde_json::to_string(&Action::NoOp).unwrap();
        assert_eq!(json, r#"{"kind":"no-op"}"#);
    }
}
