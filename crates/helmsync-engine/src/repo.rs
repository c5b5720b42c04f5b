//! Chart repository registration and index refresh

use helmsync_core::{CommandPlan, RepoCredentials};
use serde::Deserialize;

use crate::error::{EngineError, Result};
use crate::options::EngineOptions;
use crate::plan::PlanBuilder;
use crate::runner::{ProcessOutput, ProcessRunner, invoke};

/// Diagnostic printed by `repo list` when nothing is registered
const NO_REPOSITORIES: &str = "no repositories to show";

/// Marker printed by a successful `repo update`
const UPDATE_COMPLETE: &str = "Update Complete";

/// A registered chart repository
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepositoryEntry {
    pub name: String,
    pub url: String,
}

impl RepositoryEntry {
    /// Same name and same URL, ignoring a trailing slash
    pub fn matches(&self, name: &str, url: &str) -> bool {
        self.name == name && self.url.trim_end_matches('/') == url.trim_end_matches('/')
    }
}

/// Makes sure a named repository is registered and its index is fresh
pub struct RepositorySynchronizer<'a, R: ?Sized> {
    runner: &'a R,
    plans: PlanBuilder<'a>,
}

impl<'a, R: ProcessRunner + ?Sized> RepositorySynchronizer<'a, R> {
    pub fn new(runner: &'a R, options: &'a EngineOptions) -> Self {
        Self {
            runner,
            plans: PlanBuilder::new(options),
        }
    }

    /// Register `name` at `url` unless it already is, then refresh its index
    pub fn sync(&self, name: &str, url: &str, credentials: Option<&RepoCredentials>) -> Result<()> {
        self.ensure(name, url, credentials)?;
        self.refresh(name)
    }

    /// Register `name` at `url` unless an identical registration exists.
    ///
    /// A repository registered under the same name with another URL is
    /// re-registered. Registration is verified by listing again.
    pub fn ensure(&self, name: &str, url: &str, credentials: Option<&RepoCredentials>) -> Result<()> {
        let registered = self.list()?;
        if registered.iter().any(|r| r.matches(name, url)) {
            tracing::debug!(repo = name, "repository already registered");
            return Ok(());
        }

        let replace = registered.iter().any(|r| r.name == name);
        if replace {
            tracing::warn!(repo = name, url, "repository registered with another URL, replacing");
        }

        let plan = self.plans.repo_add(name, url, credentials, replace);
        let output = invoke(self.runner, &plan)?;
        if !output.is_success() {
            return Err(sync_error(name, &plan, failure_message(&output)));
        }

        if !self.list()?.iter().any(|r| r.matches(name, url)) {
            return Err(sync_error(
                name,
                &plan,
                "repository is not listed after registration".to_string(),
            ));
        }

        tracing::info!(repo = name, url, "registered chart repository");
        Ok(())
    }

    /// Update the index of `name`; anything but a confirmed update is an error
    pub fn refresh(&self, name: &str) -> Result<()> {
        let plan = self.plans.repo_update(name);
        let output = invoke(self.runner, &plan)?;

        if !output.is_success() {
            return Err(sync_error(name, &plan, failure_message(&output)));
        }
        if !output.stdout.contains(UPDATE_COMPLETE) {
            return Err(sync_error(
                name,
                &plan,
                format!("index update not confirmed: {}", output.stdout.trim()),
            ));
        }
        Ok(())
    }

    /// Registered repositories; none registered is an empty list
    pub fn list(&self) -> Result<Vec<RepositoryEntry>> {
        let plan = self.plans.repo_list();
        let output = invoke(self.runner, &plan)?;

        if !output.is_success() {
            if output.stderr.contains(NO_REPOSITORIES) {
                return Ok(Vec::new());
            }
            return Err(EngineError::Query {
                command: plan.command_line(),
                message: failure_message(&output),
            });
        }

        let stdout = output.stdout.trim();
        if stdout.is_empty() || stdout.contains(NO_REPOSITORIES) || stdout == "null" {
            return Ok(Vec::new());
        }
        serde_json::from_str(stdout).map_err(|e| EngineError::Query {
            command: plan.command_line(),
            message: e.to_string(),
        })
    }
}

fn sync_error(repo: &str, plan: &CommandPlan, message: String) -> EngineError {
    EngineError::RepoSync {
        repo: repo.to_string(),
        command: Some(plan.command_line()),
        message,
    }
}

fn failure_message(output: &ProcessOutput) -> String {
    match output.stderr.trim() {
        "" => format!("exited with status {}", output.exit_code),
        stderr => stderr.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ScriptedRunner;

    const URL: &str = "https://charts.bitnami.com/bitnami";
    const UPDATED: &str = "Hang tight while we grab the latest from your chart repositories...\n...Successfully got an update from the \"bitnami\" chart repository\nUpdate Complete. ⎈Happy Helming!⎈\n";

    fn listed(entries: &str) -> ProcessOutput {
        ProcessOutput::success(entries)
    }

    #[test]
    fn test_entry_matching_ignores_trailing_slash() {
        let entry = RepositoryEntry {
            name: "bitnami".to_string(),
            url: format!("{}/", URL),
        };
        assert!(entry.matches("bitnami", URL));
        assert!(!entry.matches("bitnami", "https://example.com"));
        assert!(!entry.matches("other", URL));
    }

    #[test]
    fn test_already_registered_skips_add() {
        let opts = EngineOptions::default();
        let runner = ScriptedRunner::new()
            .on(&["repo", "list"], listed(&format!(r#"[{{"name":"bitnami","url":"{}"}}]"#, URL)))
            .on(&["repo", "update"], ProcessOutput::success(UPDATED));

        RepositorySynchronizer::new(&runner, &opts)
            .sync("bitnami", URL, None)
            .unwrap();

        assert_eq!(runner.count(&["repo", "add"]), 0);
        assert_eq!(runner.count(&["repo", "update", "bitnami"]), 1);
    }

    #[test]
    fn test_registers_when_missing_and_verifies() {
        let opts = EngineOptions::default();
        let runner = ScriptedRunner::new()
            .on(&["repo", "list"], ProcessOutput::failure(1, "Error: no repositories to show"))
            .on(&["repo", "list"], listed(&format!(r#"[{{"name":"bitnami","url":"{}"}}]"#, URL)))
            .on(&["repo", "add"], ProcessOutput::success("\"bitnami\" has been added to your repositories"))
            .on(&["repo", "update"], ProcessOutput::success(UPDATED));

        let creds = RepoCredentials::new("deploy", "s3cret");
        RepositorySynchronizer::new(&runner, &opts)
            .sync("bitnami", URL, Some(&creds))
            .unwrap();

        let add = runner.last_call(&["repo", "add"]).unwrap();
        assert!(add.matches(&["--username", "deploy", "--password", "s3cret"]));
        assert!(!add.matches(&["--force-update"]));
        assert_eq!(runner.count(&["repo", "list"]), 2);
    }

    #[test]
    fn test_registration_not_visible_is_error() {
        let opts = EngineOptions::default();
        let runner = ScriptedRunner::new()
            .on(&["repo", "list"], listed("[]"))
            .on(&["repo", "add"], ProcessOutput::success(""));

        let err = RepositorySynchronizer::new(&runner, &opts)
            .ensure("bitnami", URL, None)
            .unwrap_err();
        assert!(matches!(err, EngineError::RepoSync { .. }));
    }

    #[test]
    fn test_changed_url_is_replaced() {
        let opts = EngineOptions::default();
        let runner = ScriptedRunner::new()
            .on(&["repo", "list"], listed(r#"[{"name":"bitnami","url":"https://old.example.com"}]"#))
            .on(&["repo", "list"], listed(&format!(r#"[{{"name":"bitnami","url":"{}"}}]"#, URL)))
            .on(&["repo", "add"], ProcessOutput::success(""));

        RepositorySynchronizer::new(&runner, &opts)
            .ensure("bitnami", URL, None)
            .unwrap();
        assert!(runner.last_call(&["repo", "add"]).unwrap().matches(&["--force-update"]));
    }

    #[test]
    fn test_refresh_failures() {
        let opts = EngineOptions::default();

        let runner = ScriptedRunner::new().on(
            &["repo", "update"],
            ProcessOutput::failure(1, "Error: no repo named \"bitnami\" found"),
        );
        let err = RepositorySynchronizer::new(&runner, &opts).refresh("bitnami").unwrap_err();
        assert!(err.to_string().contains("no repo named"));

        let runner = ScriptedRunner::new().on(&["repo", "update"], ProcessOutput::success("...failed to fetch"));
        let err = RepositorySynchronizer::new(&runner, &opts).refresh("bitnami").unwrap_err();
        assert!(matches!(err, EngineError::RepoSync { .. }));
    }

    #[test]
    fn test_list_failure_is_query_error() {
        let opts = EngineOptions::default();
        let runner = ScriptedRunner::new().on(&["repo", "list"], ProcessOutput::failure(1, "Error: permission denied"));
        let err = RepositorySynchronizer::new(&runner, &opts).list().unwrap_err();
        assert!(matches!(err, EngineError::Query { .. }));
    }
}
