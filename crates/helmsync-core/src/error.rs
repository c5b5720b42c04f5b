//! Core error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("Invalid release spec for '{name}': {message}")]
    InvalidSpec { name: String, message: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
