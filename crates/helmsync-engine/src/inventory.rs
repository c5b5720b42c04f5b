//! Observed release state
//!
//! Queries the package manager for the releases of a namespace and for the
//! revision history of one release. Current releases of the tool emit a flat
//! JSON array; the older `{"Releases": [...]}` envelope is still accepted
//! here so nothing upstream has to know about it.

use helmsync_core::{
    CommandPlan, InventorySnapshot, ObservedRelease, ReleaseStatus, Revision, RevisionHistory,
    split_chart_label,
};
use serde::Deserialize;

use crate::error::{EngineError, Result};
use crate::options::EngineOptions;
use crate::plan::PlanBuilder;
use crate::runner::{ProcessRunner, invoke};

/// Read-only queries against the package manager
pub struct ReleaseInventory<'a, R: ?Sized> {
    runner: &'a R,
    plans: PlanBuilder<'a>,
}

impl<'a, R: ProcessRunner + ?Sized> ReleaseInventory<'a, R> {
    pub fn new(runner: &'a R, options: &'a EngineOptions) -> Self {
        Self {
            runner,
            plans: PlanBuilder::new(options),
        }
    }

    /// Snapshot of every release in `namespace`, whatever its state
    pub fn list(&self, namespace: &str) -> Result<InventorySnapshot> {
        let plan = self.plans.list(namespace);
        let stdout = self.query(&plan)?;

        let records = parse_list(&stdout).map_err(|message| query_error(&plan, message))?;
        let releases = records.into_iter().map(RawRelease::into_observed);
        Ok(InventorySnapshot::from_releases(namespace, releases))
    }

    /// Revision history of release `name`
    pub fn history(&self, namespace: &str, name: &str) -> Result<RevisionHistory> {
        let plan = self.plans.history(namespace, name);
        let stdout = self.query(&plan)?;

        if is_blank(&stdout) {
            return Ok(RevisionHistory::default());
        }
        let records: Vec<RawRevision> =
            serde_json::from_str(&stdout).map_err(|e| query_error(&plan, e.to_string()))?;
        Ok(RevisionHistory::new(
            records.into_iter().filter_map(RawRevision::into_revision).collect(),
        ))
    }

    fn query(&self, plan: &CommandPlan) -> Result<String> {
        let output = invoke(self.runner, plan)?;
        if !output.is_success() {
            let message = match output.stderr.trim() {
                "" => format!("exited with status {}", output.exit_code),
                stderr => stderr.to_string(),
            };
            return Err(query_error(plan, message));
        }
        Ok(output.stdout)
    }
}

fn query_error(plan: &CommandPlan, message: String) -> EngineError {
    EngineError::Query {
        command: plan.command_line(),
        message,
    }
}

fn is_blank(stdout: &str) -> bool {
    matches!(stdout.trim(), "" | "null")
}

/// Parse list output in either the flat or the enveloped format
fn parse_list(stdout: &str) -> std::result::Result<Vec<RawRelease>, String> {
    if is_blank(stdout) {
        return Ok(Vec::new());
    }
    match serde_json::from_str::<ListOutput>(stdout).map_err(|e| e.to_string())? {
        ListOutput::Flat(releases) => Ok(releases),
        ListOutput::Legacy { releases } => {
            tracing::warn!("release list uses the legacy envelope format");
            Ok(releases)
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListOutput {
    Flat(Vec<RawRelease>),
    /// Any other object is not a release list, so `Releases` is required
    Legacy {
        #[serde(rename = "Releases")]
        releases: Vec<RawRelease>,
    },
}

#[derive(Deserialize)]
struct RawRelease {
    #[serde(alias = "Name")]
    name: String,
    #[serde(default, alias = "Status")]
    status: ReleaseStatus,
    #[serde(default, alias = "Chart")]
    chart: Option<String>,
    #[serde(default, alias = "Revision")]
    revision: Option<RevisionNumber>,
}

impl RawRelease {
    fn into_observed(self) -> ObservedRelease {
        let deployed_version = self
            .chart
            .as_deref()
            .and_then(split_chart_label)
            .map(|(_, version)| version);
        if deployed_version.is_none() {
            tracing::debug!(release = %self.name, chart = ?self.chart, "no version in chart label");
        }

        ObservedRelease {
            name: self.name,
            status: self.status,
            deployed_version,
            revision: self.revision.and_then(RevisionNumber::get),
            chart: self.chart,
        }
    }
}

#[derive(Deserialize)]
struct RawRevision {
    revision: RevisionNumber,
    #[serde(default)]
    status: ReleaseStatus,
    #[serde(default)]
    chart: Option<String>,
}

impl RawRevision {
    /// Entries without a usable revision number can never be a rollback target
    fn into_revision(self) -> Option<Revision> {
        let Some(revision) = self.revision.get().filter(|n| *n > 0) else {
            tracing::warn!(chart = ?self.chart, "skipping history entry without a valid revision");
            return None;
        };
        Some(Revision {
            revision,
            version: self
                .chart
                .as_deref()
                .and_then(split_chart_label)
                .map(|(_, version)| version),
            status: self.status,
        })
    }
}

/// `list` reports revisions as strings, `history` as numbers
#[derive(Deserialize)]
#[serde(untagged)]
enum RevisionNumber {
    Number(u32),
    Text(String),
}

impl RevisionNumber {
    fn get(self) -> Option<u32> {
        match self {
            Self::Number(n) => Some(n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{ProcessOutput, ScriptedRunner};
    use helmsync_core::ChartVersion;

    const LIST: &str = r#"[
        {"name":"ceph","namespace":"rook","revision":"3","updated":"2024-05-01 10:00:00","status":"deployed","chart":"rook-ceph-0.7.0","app_version":"1.0"},
        {"name":"old","namespace":"rook","revision":"1","status":"uninstalled","chart":"old-chart-1.0.0-rc1"},
        {"name":"odd","namespace":"rook","revision":"2","status":"superseded-ish","chart":"odd"}
    ]"#;

    fn inventory_with(runner: &ScriptedRunner, opts: &EngineOptions) -> Vec<ObservedRelease> {
        ReleaseInventory::new(runner, opts)
            .list("rook")
            .unwrap()
            .iter()
            .cloned()
            .collect()
    }

    #[test]
    fn test_list_parses_current_format() {
        let opts = EngineOptions::default();
        let runner = ScriptedRunner::new().on(&["list"], ProcessOutput::success(LIST));
        let releases = inventory_with(&runner, &opts);

        assert_eq!(releases.len(), 3);
        assert_eq!(releases[0].status, ReleaseStatus::Deployed);
        assert_eq!(releases[0].deployed_version, Some(ChartVersion::parse("0.7.0").unwrap()));
        assert_eq!(releases[0].revision, Some(3));
        assert_eq!(releases[1].status, ReleaseStatus::Deleted);
        assert_eq!(releases[1].deployed_version, Some(ChartVersion::parse("1.0.0-rc1").unwrap()));
        assert_eq!(releases[2].status, ReleaseStatus::Unknown);
        assert_eq!(releases[2].deployed_version, None);

        let call = runner.last_call(&["list"]).unwrap();
        assert_eq!(call.args, vec!["list", "--namespace", "rook", "--all", "--output", "json"]);
    }

    #[test]
    fn test_list_empty_output() {
        let opts = EngineOptions::default();
        for stdout in ["", "  \n", "[]", "null"] {
            let runner = ScriptedRunner::new().on(&["list"], ProcessOutput::success(stdout));
            let snapshot = ReleaseInventory::new(&runner, &opts).list("rook").unwrap();
            assert!(snapshot.is_empty(), "stdout {:?}", stdout);
            assert_eq!(snapshot.namespace(), "rook");
        }
    }

    #[test]
    fn test_list_legacy_envelope() {
        let opts = EngineOptions::default();
        let legacy = r#"{"Next":"","Releases":[{"Name":"ceph","Revision":4,"Status":"DEPLOYED","Chart":"rook-ceph-0.6.1","Namespace":"rook"}]}"#;
        let runner = ScriptedRunner::new().on(&["list"], ProcessOutput::success(legacy));
        let releases = inventory_with(&runner, &opts);

        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].name, "ceph");
        assert_eq!(releases[0].status, ReleaseStatus::Deployed);
        assert_eq!(releases[0].revision, Some(4));
        assert_eq!(releases[0].deployed_version, Some(ChartVersion::parse("0.6.1").unwrap()));
    }

    #[test]
    fn test_list_duplicate_names_keep_last() {
        let opts = EngineOptions::default();
        let dup = r#"[{"name":"a","status":"failed","chart":"a-1.0.0"},{"name":"a","status":"deployed","chart":"a-1.1.0"}]"#;
        let runner = ScriptedRunner::new().on(&["list"], ProcessOutput::success(dup));
        let snapshot = ReleaseInventory::new(&runner, &opts).list("default").unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get("a").unwrap().status, ReleaseStatus::Deployed);
    }

    #[test]
    fn test_list_failures_are_query_errors() {
        let opts = EngineOptions::default();

        let runner = ScriptedRunner::new().on(
            &["list"],
            ProcessOutput::failure(1, "Error: Kubernetes cluster unreachable"),
        );
        let err = ReleaseInventory::new(&runner, &opts).list("rook").unwrap_err();
        assert!(matches!(err, EngineError::Query { .. }));
        assert!(err.to_string().contains("cluster unreachable"));

        let runner = ScriptedRunner::new().on(&["list"], ProcessOutput::success("NAME\tSTATUS\nceph\tdeployed"));
        let err = ReleaseInventory::new(&runner, &opts).list("rook").unwrap_err();
        assert!(matches!(err, EngineError::Query { .. }));
    }

    #[test]
    fn test_spawn_failure() {
        let opts = EngineOptions::default();
        let runner = ScriptedRunner::new();
        let err = ReleaseInventory::new(&runner, &opts).list("rook").unwrap_err();
        assert!(matches!(err, EngineError::Spawn { .. }));
    }

    #[test]
    fn test_history() {
        let opts = EngineOptions::default();
        let history = r#"[
            {"revision":3,"updated":"","status":"superseded","chart":"rook-ceph-2.0.0","app_version":"","description":"Upgrade complete"},
            {"revision":5,"status":"superseded","chart":"rook-ceph-1.5.0"},
            {"revision":7,"status":"deployed","chart":"rook-ceph-1.5.0"}
        ]"#;
        let runner = ScriptedRunner::new().on(&["history"], ProcessOutput::success(history));
        let revisions = ReleaseInventory::new(&runner, &opts).history("rook", "ceph").unwrap();

        assert_eq!(revisions.len(), 3);
        assert_eq!(
            revisions.latest_revision_of(&ChartVersion::parse("1.5.0").unwrap()),
            Some(7)
        );
        assert_eq!(
            runner.last_call(&["history"]).unwrap().args,
            vec!["history", "ceph", "--namespace", "rook", "--output", "json"]
        );
    }

    #[test]
    fn test_list_object_without_releases_is_query_error() {
        let opts = EngineOptions::default();
        for stdout in [r#"{"error":"releases is forbidden"}"#, "{}", r#"{"Next":""}"#] {
            let runner = ScriptedRunner::new().on(&["list"], ProcessOutput::success(stdout));
            let err = ReleaseInventory::new(&runner, &opts).list("rook").unwrap_err();
            assert!(matches!(err, EngineError::Query { .. }), "stdout {:?}", stdout);
        }
    }

    #[test]
    fn test_history_skips_entries_without_revision() {
        let opts = EngineOptions::default();
        let history = r#"[
            {"revision":"n/a","status":"superseded","chart":"rook-ceph-1.0.0"},
            {"revision":0,"status":"superseded","chart":"rook-ceph-1.0.0"},
            {"revision":"4","status":"deployed","chart":"rook-ceph-2.0.0"}
        ]"#;
        let runner = ScriptedRunner::new().on(&["history"], ProcessOutput::success(history));
        let revisions = ReleaseInventory::new(&runner, &opts).history("rook", "ceph").unwrap();

        assert_eq!(revisions.len(), 1);
        assert_eq!(revisions.latest_revision_of(&ChartVersion::parse("1.0.0").unwrap()), None);
        assert_eq!(
            revisions.latest_revision_of(&ChartVersion::parse("2.0.0").unwrap()),
            Some(4)
        );
    }
}
