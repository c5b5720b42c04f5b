//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// Success - every selected release converged or was already converged
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// At least one release failed to reconcile
pub const RECONCILE_FAILED: i32 = 2;

/// Manifest missing, unreadable, or invalid
pub const MANIFEST_ERROR: i32 = 3;

/// Querying the package manager failed
pub const QUERY_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;
