//! Plan command - show what reconcile would do

use console::style;
use helmsync_engine::{ReconciliationEngine, SystemRunner};
use std::path::Path;

use crate::config::{self, Manifest, Overrides};
use crate::display;
use crate::error::{CliError, Result};

/// Run the plan command
pub fn run(manifest: Option<&Path>, releases: &[String], overrides: &Overrides) -> Result<()> {
    let path = config::locate(manifest)?;
    let manifest = Manifest::load(&path)?;
    let selected = manifest.select(releases)?;

    let engine = ReconciliationEngine::new(
        SystemRunner::new(),
        manifest.settings.engine_options(overrides),
    );

    let mut failed = 0;
    for spec in &selected {
        match engine.plan(spec) {
            Ok(plan) => display::print_plan(spec, &plan),
            Err(err) => {
                failed += 1;
                println!(
                    "{}/{}: {} {}",
                    spec.namespace,
                    spec.deploy_name,
                    style("error").red().bold(),
                    err
                );
            }
        }
    }

    if failed > 0 {
        return Err(CliError::ReconcileFailed {
            failed,
            total: selected.len(),
        });
    }
    Ok(())
}
