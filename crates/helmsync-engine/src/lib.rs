//! helmsync Engine - Helm release reconciliation
//!
//! This crate provides:
//! - **Process Runners**: The narrow interface to the `helm` binary, plus a scripted runner for tests
//! - **Release Inventory**: Observed releases and revision history, parsed from structured output
//! - **Repository Sync**: Idempotent chart repository registration and index refresh
//! - **Reconciliation Engine**: The state machine that picks install/upgrade/reinstall/rollback/delete
//! - **Command Executor**: Runs one plan and classifies its outcome
//! - **Result Reporter**: Turns decisions and outcomes into immutable results

pub mod engine;
pub mod error;
pub mod executor;
pub mod inventory;
pub mod options;
pub mod plan;
pub mod repo;
pub mod report;
pub mod runner;

pub use engine::{Decision, ReconciliationEngine, ReleasePlan, decide};
pub use error::{EngineError, Result};
pub use executor::{CommandExecutor, ExecutionOutcome, Verdict};
pub use inventory::ReleaseInventory;
pub use options::{EngineOptions, FailedReleasePolicy, FlagComposition};
pub use plan::PlanBuilder;
pub use repo::{RepositoryEntry, RepositorySynchronizer};
pub use report::ResultReporter;
pub use runner::{ProcessOutput, ProcessRunner, ScriptedRunner, SystemRunner};
