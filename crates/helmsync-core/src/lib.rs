//! helmsync Core - Core types for Helm release reconciliation
//!
//! This crate provides the foundational types used throughout helmsync:
//! - `ReleaseSpec`: The desired state of a release (chart, version, lifecycle)
//! - `ObservedRelease` / `InventorySnapshot`: What the cluster currently reports
//! - `ChartVersion`: Semantic-version aware comparison tolerant of short forms
//! - `Action` / `CommandPlan`: The decided transition and its exact invocation
//! - `ReconciliationResult`: The immutable outcome of one reconciliation call

pub mod error;
pub mod plan;
pub mod release;
pub mod result;
pub mod spec;
pub mod version;

pub use error::{CoreError, Result};
pub use plan::{Action, CommandPlan, CommandPlanBuilder};
pub use release::{InventorySnapshot, ObservedRelease, ReleaseStatus, Revision, RevisionHistory};
pub use result::{ReconciliationResult, ReleaseDescriptor};
pub use spec::{ChartRef, ChartSource, Lifecycle, ReleaseSpec, RepoCredentials};
pub use version::{ChartVersion, DesiredVersion, compare, split_chart_label};
