//! Display formatting for CLI output

use console::style;
use helmsync_core::{Action, InventorySnapshot, ReconciliationResult, ReleaseSpec, ReleaseStatus};
use helmsync_engine::ReleasePlan;
use serde::Serialize;

/// One reconciliation result, labelled with its release
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelledResult<'a> {
    pub deploy_name: &'a str,
    pub namespace: &'a str,
    #[serde(flatten)]
    pub result: &'a ReconciliationResult,
}

/// Short status word for a result
pub fn status_word(result: &ReconciliationResult) -> &'static str {
    if result.is_failed() {
        "failed"
    } else if result.is_changed() {
        "changed"
    } else if result.command_line().is_some() {
        "dry-run"
    } else {
        "ok"
    }
}

/// Print one result line, plus the command line of failures
pub fn print_result(spec: &ReleaseSpec, result: &ReconciliationResult) {
    let word = status_word(result);
    let styled = match word {
        "failed" => style(word).red().bold(),
        "changed" => style(word).yellow(),
        "dry-run" => style(word).cyan(),
        _ => style(word).green(),
    };

    println!(
        "{:<9} {}/{}: {}",
        styled,
        spec.namespace,
        spec.deploy_name,
        result.message()
    );

    if result.is_failed()
        && let Some(cmd) = result.command_line()
    {
        println!("          {} {}", style("command:").dim(), cmd);
    }
}

/// Print the closing summary line
pub fn print_summary(results: &[ReconciliationResult]) {
    let failed = results.iter().filter(|r| r.is_failed()).count();
    let changed = results.iter().filter(|r| r.is_changed()).count();
    let unchanged = results.len() - failed - changed;

    println!();
    println!(
        "{} changed, {} unchanged, {} failed",
        style(changed).yellow(),
        style(unchanged).green(),
        if failed > 0 {
            style(failed).red().bold()
        } else {
            style(failed).dim()
        }
    );
}

/// Print a planned action
pub fn print_plan(spec: &ReleaseSpec, plan: &ReleasePlan) {
    let action = match plan.action {
        Action::NoOp => style(plan.action.to_string()).green(),
        Action::Delete => style(plan.action.to_string()).red(),
        _ => style(plan.action.to_string()).yellow(),
    };
    println!("{}/{}: {}", spec.namespace, spec.deploy_name, action);
    if let Some(command) = &plan.command {
        println!("  {}", style(command.command_line()).dim());
    }
}

/// Print an inventory snapshot as a table
pub fn print_inventory(snapshot: &InventorySnapshot) {
    if snapshot.is_empty() {
        println!("No releases found in namespace {}", snapshot.namespace());
        return;
    }

    println!(
        "{:<24} {:<10} {:<17} {:<12}",
        style("NAME").bold(),
        style("REVISION").bold(),
        style("STATUS").bold(),
        style("VERSION").bold()
    );

    for release in snapshot.iter() {
        let status = release.status.to_string();
        let status = match release.status {
            ReleaseStatus::Deployed => style(status).green(),
            ReleaseStatus::Failed => style(status).red(),
            ReleaseStatus::PendingInstall | ReleaseStatus::PendingUpgrade => style(status).yellow(),
            _ => style(status).dim(),
        };
        println!(
            "{:<24} {:<10} {:<17} {:<12}",
            release.name,
            release.revision.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string()),
            status,
            release
                .deployed_version
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "-".to_string())
        );
    }
}
