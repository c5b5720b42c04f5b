//! Error types for helmsync-engine

use helmsync_core::CoreError;
use thiserror::Error;

/// Result type for helmsync-engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that end a reconciliation call.
///
/// None of these are retried internally; the caller owns retry policy.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// Desired version is malformed
    #[error("invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    /// Spec cannot be acted on
    #[error("invalid release spec for '{name}': {message}")]
    InvalidSpec { name: String, message: String },

    /// Inventory, history, or repository list query failed or was unparsable
    #[error("query `{command}` failed: {message}")]
    Query { command: String, message: String },

    /// Repository registration or refresh failed
    #[error("cannot synchronize chart repository '{repo}': {message}")]
    RepoSync {
        repo: String,
        command: Option<String>,
        message: String,
    },

    /// Local chart dependency refresh failed
    #[error("cannot update dependencies of chart '{chart}': {message}")]
    DependencyUpdate {
        chart: String,
        command: String,
        message: String,
    },

    /// Rollback target version was never deployed
    #[error(
        "cannot roll back '{name}': version {version} has never been deployed (currently {status} at version {deployed})"
    )]
    NoSuchRevision {
        name: String,
        version: String,
        status: String,
        deployed: String,
    },

    /// Mutating command exited non-zero
    #[error("command exited with status {exit_code}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// Mutating command exited zero but the release is not in an accepted state
    #[error("command succeeded but release status is '{status}'")]
    UnacceptedStatus { command: String, status: String },

    /// Structured output of a mutating command could not be parsed
    #[error("cannot parse output of `{command}`: {message}")]
    MalformedOutput { command: String, message: String },

    /// Fail-fast policy refused a failed or pending release
    #[error(
        "release '{name}' is {status}; not reconciling forward\nHint: set failedReleasePolicy to reconcile-forward or repair the release manually"
    )]
    UnreconcilableStatus { name: String, status: String },

    /// The external binary could not be started
    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl EngineError {
    /// The command line that produced this error, if one was built
    pub fn command_line(&self) -> Option<&str> {
        match self {
            Self::Query { command, .. }
            | Self::DependencyUpdate { command, .. }
            | Self::CommandFailed { command, .. }
            | Self::UnacceptedStatus { command, .. }
            | Self::MalformedOutput { command, .. } => Some(command),
            Self::RepoSync { command, .. } => command.as_deref(),
            Self::Spawn { program, .. } => Some(program),
            _ => None,
        }
    }

    /// Whether the error was raised before any command could be issued
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InvalidVersion { .. } | Self::InvalidSpec { .. })
    }
}

impl From<CoreError> for EngineError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidVersion { version, reason } => {
                EngineError::InvalidVersion { version, reason }
            }
            CoreError::InvalidSpec { name, message } => EngineError::InvalidSpec { name, message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_message_carries_stderr() {
        let err = EngineError::CommandFailed {
            command: "helm upgrade --install ceph".to_string(),
            exit_code: 2,
            stderr: "Error: timed out waiting for condition".to_string(),
        };
        assert!(err.to_string().contains("timed out waiting for condition"));
        assert_eq!(err.command_line(), Some("helm upgrade --install ceph"));
    }

    #[test]
    fn test_core_errors_convert() {
        let err: EngineError = CoreError::InvalidVersion {
            version: "x".to_string(),
            reason: "bad".to_string(),
        }
        .into();
        assert!(err.is_input_error());
        assert_eq!(err.command_line(), None);
    }
}
