//! CLI commands

pub mod list;
pub mod plan;
pub mod reconcile;
