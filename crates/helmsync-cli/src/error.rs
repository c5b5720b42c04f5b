//! CLI error types with exit code handling
//!
//! This module provides a unified error type for CLI operations that
//! maps errors to appropriate exit codes.

use helmsync_engine::EngineError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Manifest could not be found, read, or understood
    #[error("Manifest error: {message}")]
    #[diagnostic(code(helmsync::cli::manifest))]
    Manifest {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Query against the package manager failed
    #[error("Query failed: {message}")]
    #[diagnostic(code(helmsync::cli::query))]
    Query {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// One or more releases failed
    #[error("{failed} of {total} release(s) failed")]
    #[diagnostic(code(helmsync::cli::reconcile))]
    ReconcileFailed { failed: usize, total: usize },

    /// Invalid arguments
    #[error("{message}")]
    #[diagnostic(code(helmsync::cli::usage))]
    Usage {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(helmsync::cli::io))]
    Io { message: String },

    /// Anything else
    #[error("{message}")]
    #[diagnostic(code(helmsync::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Manifest { .. } => exit_codes::MANIFEST_ERROR,
            CliError::Query { .. } => exit_codes::QUERY_ERROR,
            CliError::ReconcileFailed { .. } => exit_codes::RECONCILE_FAILED,
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    /// Create a manifest error
    pub fn manifest(message: impl Into<String>) -> Self {
        Self::Manifest {
            message: message.into(),
            help: None,
        }
    }

    /// Create a manifest error with help text
    pub fn manifest_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Manifest {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a usage error with help text
    pub fn usage_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Other {
            message: err.to_string(),
        }
    }
}

impl From<EngineError> for CliError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Spawn { ref program, .. } => CliError::Query {
                help: Some(format!(
                    "Check that '{}' is installed, or point --helm-bin at it",
                    program
                )),
                message: err.to_string(),
            },
            EngineError::InvalidVersion { .. } | EngineError::InvalidSpec { .. } => {
                CliError::manifest(err.to_string())
            }
            _ => CliError::Query {
                message: err.to_string(),
                help: None,
            },
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            CliError::ReconcileFailed { failed: 1, total: 3 }.exit_code(),
            exit_codes::RECONCILE_FAILED
        );
        assert_eq!(CliError::manifest("missing").exit_code(), exit_codes::MANIFEST_ERROR);
    }

    #[test]
    fn test_spawn_error_has_help() {
        let err: CliError = EngineError::Spawn {
            program: "helm".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        }
        .into();
        match err {
            CliError::Query { help, .. } => assert!(help.unwrap().contains("--helm-bin")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
