//! Command plan construction for every external invocation

use helmsync_core::{Action, ChartSource, CommandPlan, CommandPlanBuilder, ReleaseSpec, RepoCredentials};

use crate::options::EngineOptions;

/// Builds [`CommandPlan`]s from engine options and release specs.
///
/// Every plan starts with the global arguments (`--kube-context`), so all
/// invocations of one engine target the same cluster.
#[derive(Debug, Clone)]
pub struct PlanBuilder<'a> {
    options: &'a EngineOptions,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(options: &'a EngineOptions) -> Self {
        Self { options }
    }

    fn base(&self) -> CommandPlanBuilder {
        let builder = CommandPlan::builder(&self.options.helm_binary);
        match &self.options.kube_context {
            Some(ctx) => builder.arg("--kube-context").arg(ctx),
            None => builder,
        }
    }

    /// `list --namespace <ns> --all --output json`
    pub fn list(&self, namespace: &str) -> CommandPlan {
        self.base()
            .args(["list", "--namespace", namespace, "--all", "--output", "json"])
            .structured(true)
            .build()
    }

    /// `history <name> --namespace <ns> --output json`
    pub fn history(&self, namespace: &str, name: &str) -> CommandPlan {
        self.base()
            .args(["history", name, "--namespace", namespace, "--output", "json"])
            .structured(true)
            .build()
    }

    /// `repo list -o json`
    pub fn repo_list(&self) -> CommandPlan {
        self.base()
            .args(["repo", "list", "-o", "json"])
            .structured(true)
            .build()
    }

    /// `repo add [--force-update] [--username U --password P] <name> <url>`
    pub fn repo_add(
        &self,
        name: &str,
        url: &str,
        credentials: Option<&RepoCredentials>,
        replace: bool,
    ) -> CommandPlan {
        let mut builder = self
            .base()
            .args(["repo", "add"])
            .arg_if(replace, "--force-update");
        if let Some(creds) = credentials {
            builder = builder
                .args(["--username", creds.username.as_str(), "--password"])
                .secret(&creds.password);
        }
        builder.args([name, url]).build()
    }

    /// `repo update <name>`
    pub fn repo_update(&self, name: &str) -> CommandPlan {
        self.base().args(["repo", "update", name]).build()
    }

    /// `dependency update <path>`
    pub fn dependency_update(&self, chart_path: &str) -> CommandPlan {
        self.base().args(["dependency", "update", chart_path]).build()
    }

    /// Plan for a mutating action, or `None` for `NoOp`
    pub fn for_action(&self, action: Action, spec: &ReleaseSpec) -> Option<CommandPlan> {
        match action {
            Action::NoOp => None,
            Action::Install | Action::Reinstall | Action::Upgrade => Some(self.deploy(action, spec)),
            Action::Rollback { target_revision } => Some(self.rollback(spec, target_revision)),
            Action::Delete => Some(self.uninstall(spec)),
        }
    }

    /// Install, reinstall, or upgrade.
    ///
    /// Token order: verb, name, force, create-namespace, replace, chart,
    /// namespace, version, values file, set flags, then output mode.
    fn deploy(&self, action: Action, spec: &ReleaseSpec) -> CommandPlan {
        let check = self.options.check_mode;
        let composable = self.options.flag_composition.is_composable();

        let builder = match action {
            Action::Upgrade => self.base().args(["upgrade", "--install"]),
            _ => self.base().arg("install"),
        };

        let force = spec.force
            && match action {
                Action::Upgrade => true,
                Action::Reinstall => composable,
                _ => false,
            };

        let mut builder = builder
            .arg(&spec.deploy_name)
            .arg_if(force, "--force")
            .arg_if(
                action == Action::Install && spec.create_namespace,
                "--create-namespace",
            )
            .arg_if(action == Action::Reinstall, "--replace")
            .arg(spec.chart.reference())
            .args(["--namespace", spec.namespace.as_str()]);

        // wildcards ("", "latest", zero) leave the constraint off
        let pinned = spec.desired_version().is_ok_and(|v| !v.is_latest());
        if let Some(version) = spec.version.as_deref().filter(|_| pinned) {
            builder = builder.args(["--version", version.trim()]);
        }
        if let Some(values) = &spec.values_file {
            builder = builder.arg("-f").arg(values.display().to_string());
        }
        for set in &spec.set_values {
            builder = builder.args(["--set", set.as_str()]);
        }

        finish(builder, check, true)
    }

    fn rollback(&self, spec: &ReleaseSpec, revision: u32) -> CommandPlan {
        let force = spec.force && self.options.flag_composition.is_composable();
        let builder = self
            .base()
            .args(["rollback", spec.deploy_name.as_str()])
            .arg(revision.to_string())
            .args(["--namespace", spec.namespace.as_str()])
            .arg_if(force, "--force");
        finish(builder, self.options.check_mode, false)
    }

    fn uninstall(&self, spec: &ReleaseSpec) -> CommandPlan {
        let builder = self
            .base()
            .args(["uninstall", spec.deploy_name.as_str()])
            .args(["--namespace", spec.namespace.as_str()]);
        finish(builder, self.options.check_mode, false)
    }
}

/// Check mode replaces structured output with `--dry-run`
fn finish(builder: CommandPlanBuilder, check: bool, structured: bool) -> CommandPlan {
    if check {
        builder.arg("--dry-run").dry_run(true).build()
    } else if structured {
        builder.args(["--output", "json"]).structured(true).build()
    } else {
        builder.build()
    }
}

/// Local chart directory, if the spec points at one
pub(crate) fn local_chart_path(spec: &ReleaseSpec) -> Option<String> {
    match &spec.chart.source {
        ChartSource::Local { path } => Some(path.display().to_string()),
        ChartSource::Repo { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::FlagComposition;
    use helmsync_core::ChartRef;

    fn ceph() -> ReleaseSpec {
        ReleaseSpec::new("ceph", ChartRef::local("rook-ceph", "/tmp/charts/rook-ceph"))
            .in_namespace("rook")
            .with_version("0.8.0")
            .with_values_file("/tmp/values.yaml")
    }

    #[test]
    fn test_install_plan() {
        let opts = EngineOptions::default();
        let plan = PlanBuilder::new(&opts).for_action(Action::Install, &ceph()).unwrap();

        insta::assert_snapshot!(
            plan.command_line(),
            @"helm install ceph --create-namespace /tmp/charts/rook-ceph --namespace rook --version 0.8.0 -f /tmp/values.yaml --output json"
        );
        assert!(plan.structured_output());
        assert!(!plan.contains("--replace"));
        assert!(!plan.contains("upgrade"));
    }

    #[test]
    fn test_reinstall_plan_has_replace_without_create_namespace() {
        let opts = EngineOptions::default();
        let spec = ceph().with_force();
        let plan = PlanBuilder::new(&opts).for_action(Action::Reinstall, &spec).unwrap();

        assert!(plan.contains("--replace"));
        assert!(!plan.contains("--create-namespace"));
        assert!(!plan.contains("--force"));
    }

    #[test]
    fn test_composable_force_on_reinstall_and_rollback() {
        let opts = EngineOptions::default().with_flag_composition(FlagComposition::Composable);
        let builder = PlanBuilder::new(&opts);
        let spec = ceph().with_force();

        let reinstall = builder.for_action(Action::Reinstall, &spec).unwrap();
        assert!(reinstall.contains("--force"));
        assert!(reinstall.contains("--replace"));

        let rollback = builder
            .for_action(Action::Rollback { target_revision: 4 }, &spec)
            .unwrap();
        assert_eq!(rollback.command_line(), "helm rollback ceph 4 --namespace rook --force");
    }

    #[test]
    fn test_upgrade_plan_with_force_and_repo_chart() {
        let opts = EngineOptions::default().with_kube_context("kind-dev");
        let mut spec = ReleaseSpec::new(
            "web",
            ChartRef::repo("nginx", "bitnami", "https://charts.bitnami.com/bitnami"),
        )
        .with_force();
        spec.set_values = vec!["replicaCount=2".to_string()];

        let plan = PlanBuilder::new(&opts).for_action(Action::Upgrade, &spec).unwrap();
        insta::assert_snapshot!(
            plan.command_line(),
            @"helm --kube-context kind-dev upgrade --install web --force bitnami/nginx --namespace default --set replicaCount=2 --output json"
        );
    }

    #[test]
    fn test_check_mode_uses_dry_run() {
        let opts = EngineOptions::default().check_mode();
        let builder = PlanBuilder::new(&opts);

        let install = builder.for_action(Action::Install, &ceph()).unwrap();
        assert!(install.is_dry_run());
        assert!(!install.structured_output());
        assert!(install.contains("--dry-run"));
        assert!(!install.contains("--output"));

        let delete = builder.for_action(Action::Delete, &ceph()).unwrap();
        assert_eq!(delete.command_line(), "helm uninstall ceph --namespace rook --dry-run");
    }

    #[test]
    fn test_latest_version_is_not_pinned() {
        let opts = EngineOptions::default();
        let spec = ceph().with_version("latest");
        let plan = PlanBuilder::new(&opts).for_action(Action::Upgrade, &spec).unwrap();
        assert!(!plan.contains("--version"));
    }

    #[test]
    fn test_noop_has_no_plan() {
        let opts = EngineOptions::default();
        assert!(PlanBuilder::new(&opts).for_action(Action::NoOp, &ceph()).is_none());
    }

    #[test]
    fn test_repo_add_masks_password() {
        let opts = EngineOptions::default();
        let creds = RepoCredentials::new("deploy", "s3cret");
        let plan = PlanBuilder::new(&opts).repo_add(
            "private",
            "https://charts.example.com",
            Some(&creds),
            false,
        );

        assert!(plan.contains("s3cret"));
        assert_eq!(
            plan.command_line(),
            "helm repo add --username deploy --password ******** private https://charts.example.com"
        );
    }

    #[test]
    fn test_query_plans() {
        let opts = EngineOptions::default();
        let builder = PlanBuilder::new(&opts);
        assert_eq!(
            builder.list("rook").command_line(),
            "helm list --namespace rook --all --output json"
        );
        assert_eq!(
            builder.history("rook", "ceph").command_line(),
            "helm history ceph --namespace rook --output json"
        );
        assert_eq!(builder.repo_update("bitnami").command_line(), "helm repo update bitnami");
        assert!(builder.repo_list().structured_output());
    }
}
