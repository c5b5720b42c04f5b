//! Engine options: binary location, global flags, and reconciliation policies

use serde::{Deserialize, Serialize};

/// Options shared by every reconciliation call of an engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Package manager binary
    pub helm_binary: String,

    /// Kube context passed to every invocation
    pub kube_context: Option<String>,

    /// Dry-run mode: compute and preview, never mutate
    pub check_mode: bool,

    /// What to do with failed, pending, or unknown releases
    pub failed_release_policy: FailedReleasePolicy,

    /// Whether force and replace semantics may be combined
    pub flag_composition: FlagComposition,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            helm_binary: "helm".to_string(),
            kube_context: None,
            check_mode: false,
            failed_release_policy: FailedReleasePolicy::default(),
            flag_composition: FlagComposition::default(),
        }
    }
}

impl EngineOptions {
    /// Default options for a specific binary
    pub fn new(helm_binary: impl Into<String>) -> Self {
        Self {
            helm_binary: helm_binary.into(),
            ..Default::default()
        }
    }

    /// Target a specific kube context
    pub fn with_kube_context(mut self, context: impl Into<String>) -> Self {
        self.kube_context = Some(context.into());
        self
    }

    /// Enable dry-run mode
    pub fn check_mode(mut self) -> Self {
        self.check_mode = true;
        self
    }

    /// Set the policy for unsettled releases
    pub fn with_failed_release_policy(mut self, policy: FailedReleasePolicy) -> Self {
        self.failed_release_policy = policy;
        self
    }

    /// Set the force/replace composition rule
    pub fn with_flag_composition(mut self, composition: FlagComposition) -> Self {
        self.flag_composition = composition;
        self
    }
}

/// Handling of releases that are failed, pending, or in an unknown state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailedReleasePolicy {
    /// Upgrade in place; no automatic unwind is attempted (default)
    #[default]
    ReconcileForward,

    /// Refuse and report the release state
    FailFast,
}

impl std::fmt::Display for FailedReleasePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReconcileForward => write!(f, "reconcile-forward"),
            Self::FailFast => write!(f, "fail-fast"),
        }
    }
}

impl std::str::FromStr for FailedReleasePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reconcile-forward" | "forward" => Ok(Self::ReconcileForward),
            "fail-fast" | "fail" => Ok(Self::FailFast),
            _ => Err(format!("unknown failed release policy: {}", s)),
        }
    }
}

/// Whether `--force` and `--replace` are mutually exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlagComposition {
    /// Force only on upgrade, replace only on reinstall (default)
    #[default]
    Exclusive,

    /// Requested force also applies to reinstall and rollback
    Composable,
}

impl FlagComposition {
    pub fn is_composable(&self) -> bool {
        matches!(self, Self::Composable)
    }
}

impl std::fmt::Display for FlagComposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exclusive => write!(f, "exclusive"),
            Self::Composable => write!(f, "composable"),
        }
    }
}

impl std::str::FromStr for FlagComposition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exclusive" => Ok(Self::Exclusive),
            "composable" => Ok(Self::Composable),
            _ => Err(format!("unknown flag composition: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_options_builder() {
        let opts = EngineOptions::new("/usr/local/bin/helm")
            .with_kube_context("staging")
            .check_mode()
            .with_failed_release_policy(FailedReleasePolicy::FailFast);

        assert_eq!(opts.helm_binary, "/usr/local/bin/helm");
        assert_eq!(opts.kube_context.as_deref(), Some("staging"));
        assert!(opts.check_mode);
        assert_eq!(opts.failed_release_policy, FailedReleasePolicy::FailFast);
        assert_eq!(opts.flag_composition, FlagComposition::Exclusive);
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(
            "fail-fast".parse::<FailedReleasePolicy>().unwrap(),
            FailedReleasePolicy::FailFast
        );
        assert_eq!(
            "Reconcile-Forward".parse::<FailedReleasePolicy>().unwrap(),
            FailedReleasePolicy::ReconcileForward
        );
        assert!("sideways".parse::<FailedReleasePolicy>().is_err());
        assert_eq!(
            "composable".parse::<FlagComposition>().unwrap(),
            FlagComposition::Composable
        );
    }
}
