//! Release reconciliation
//!
//! The engine compares a [`ReleaseSpec`] with what the package manager
//! reports and converges the release with at most one mutating command.
//! Every read-only and preparatory step (inventory, revision history,
//! repository sync, dependency update) runs before that command, so a
//! failing step never leaves a half-applied change behind.

use helmsync_core::{
    Action, ChartSource, ChartVersion, CommandPlan, Lifecycle, ObservedRelease,
    ReconciliationResult, ReleaseSpec, ReleaseStatus,
};
use std::cmp::Ordering;

use crate::error::{EngineError, Result};
use crate::executor::CommandExecutor;
use crate::inventory::ReleaseInventory;
use crate::options::{EngineOptions, FailedReleasePolicy};
use crate::plan::{PlanBuilder, local_chart_path};
use crate::repo::RepositorySynchronizer;
use crate::report::ResultReporter;
use crate::runner::{ProcessRunner, invoke};

/// Transition chosen from the spec and the observed release alone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Fully determined action
    Act(Action),
    /// Roll back to the newest revision that deployed this version
    RollbackTo(ChartVersion),
}

/// Pick the transition for `spec` given the observed release, if any.
///
/// Pure: no process is started. Rollbacks are returned unresolved because
/// the target revision needs the release history.
pub fn decide(
    spec: &ReleaseSpec,
    observed: Option<&ObservedRelease>,
    policy: FailedReleasePolicy,
) -> Result<Decision> {
    let desired = spec.desired_version()?;

    let observed = match (spec.state, observed) {
        (Lifecycle::Absent, None) => return Ok(Decision::Act(Action::NoOp)),
        (Lifecycle::Absent, Some(_)) => return Ok(Decision::Act(Action::Delete)),
        (Lifecycle::Present, None) => return Ok(Decision::Act(Action::Install)),
        (Lifecycle::Present, Some(observed)) => observed,
    };

    match observed.status {
        ReleaseStatus::Deleted => Ok(Decision::Act(Action::Reinstall)),
        ReleaseStatus::Deployed => {
            let (Some(wanted), Some(deployed)) = (desired.exact(), observed.deployed_version.as_ref())
            else {
                return Ok(Decision::Act(Action::Upgrade));
            };
            Ok(match wanted.cmp(deployed) {
                Ordering::Greater => Decision::Act(Action::Upgrade),
                Ordering::Equal => Decision::Act(Action::NoOp),
                Ordering::Less => Decision::RollbackTo(wanted.clone()),
            })
        }
        status => match policy {
            FailedReleasePolicy::ReconcileForward => {
                tracing::warn!(release = %observed.name, %status, "reconciling forward from unsettled release");
                Ok(Decision::Act(Action::Upgrade))
            }
            FailedReleasePolicy::FailFast => Err(EngineError::UnreconcilableStatus {
                name: observed.name.clone(),
                status: status.to_string(),
            }),
        },
    }
}

/// Decided action and the command that carries it out
#[derive(Debug, Clone, PartialEq)]
pub struct ReleasePlan {
    pub action: Action,
    /// `None` for `NoOp`
    pub command: Option<CommandPlan>,
}

/// Converges releases toward their specs.
///
/// Holds no per-call state: every call takes a fresh inventory snapshot
/// and drops it before returning.
pub struct ReconciliationEngine<R> {
    runner: R,
    options: EngineOptions,
}

impl<R: ProcessRunner> ReconciliationEngine<R> {
    pub fn new(runner: R, options: EngineOptions) -> Self {
        Self { runner, options }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Read-only queries through this engine's runner
    pub fn inventory(&self) -> ReleaseInventory<'_, R> {
        ReleaseInventory::new(&self.runner, &self.options)
    }

    /// Reconcile one release. Never panics and never returns early without a result.
    pub fn reconcile(&self, spec: &ReleaseSpec) -> ReconciliationResult {
        let reporter = ResultReporter::new(spec);

        let action = match self.resolve(spec) {
            Ok(action) => action,
            Err(err) => return reporter.error(None, &err),
        };
        tracing::info!(
            release = %spec.deploy_name,
            namespace = %spec.namespace,
            %action,
            "decided"
        );

        let Some(plan) = PlanBuilder::new(&self.options).for_action(action, spec) else {
            return reporter.noop();
        };

        if let Err(err) = self.prepare(action, spec) {
            return reporter.error(Some(action), &err);
        }

        match CommandExecutor::new(&self.runner).execute(action, &plan) {
            Ok(outcome) => reporter.outcome(action, &plan, &outcome),
            Err(err) => reporter.error(Some(action), &err),
        }
    }

    /// Decide and build the command without synchronizing or executing anything
    pub fn plan(&self, spec: &ReleaseSpec) -> Result<ReleasePlan> {
        let action = self.resolve(spec)?;
        Ok(ReleasePlan {
            action,
            command: PlanBuilder::new(&self.options).for_action(action, spec),
        })
    }

    /// Validate, observe, decide, and resolve rollback targets
    fn resolve(&self, spec: &ReleaseSpec) -> Result<Action> {
        spec.validate()?;

        let snapshot = self.inventory().list(&spec.namespace)?;
        let observed = snapshot.get(&spec.deploy_name);

        match decide(spec, observed, self.options.failed_release_policy)? {
            Decision::Act(action) => Ok(action),
            Decision::RollbackTo(version) => {
                let history = self.inventory().history(&spec.namespace, &spec.deploy_name)?;
                match history.latest_revision_of(&version) {
                    Some(target_revision) => Ok(Action::Rollback { target_revision }),
                    None => Err(EngineError::NoSuchRevision {
                        name: spec.deploy_name.clone(),
                        version: version.to_string(),
                        status: observed.map(|o| o.status.to_string()).unwrap_or_default(),
                        deployed: observed
                            .and_then(|o| o.deployed_version.as_ref())
                            .map(ToString::to_string)
                            .unwrap_or_default(),
                    }),
                }
            }
        }
    }

    /// Repository sync and dependency refresh ahead of the mutating command
    fn prepare(&self, action: Action, spec: &ReleaseSpec) -> Result<()> {
        if matches!(action, Action::NoOp | Action::Delete) {
            return Ok(());
        }

        if let ChartSource::Repo {
            name,
            url,
            credentials,
        } = &spec.chart.source
        {
            RepositorySynchronizer::new(&self.runner, &self.options).sync(
                name,
                url,
                credentials.as_ref(),
            )?;
        }

        let deploys = matches!(action, Action::Install | Action::Reinstall | Action::Upgrade);
        if let Some(path) = local_chart_path(spec).filter(|_| deploys && spec.update_dependencies) {
            let plan = PlanBuilder::new(&self.options).dependency_update(&path);
            let output = invoke(&self.runner, &plan)?;
            if !output.is_success() {
                return Err(EngineError::DependencyUpdate {
                    chart: path,
                    command: plan.command_line(),
                    message: output.stderr.trim().to_string(),
                });
            }
        }

        Ok(())
    }
}
