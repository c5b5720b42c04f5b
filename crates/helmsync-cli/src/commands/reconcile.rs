//! Reconcile command - converge declared releases

use helmsync_core::ReconciliationResult;
use helmsync_engine::{ReconciliationEngine, SystemRunner};
use std::path::Path;

use crate::config::{self, Manifest, Overrides};
use crate::display::{self, LabelledResult};
use crate::error::{CliError, Result};

/// Run the reconcile command
pub fn run(
    manifest: Option<&Path>,
    releases: &[String],
    overrides: &Overrides,
    output_json: bool,
) -> Result<()> {
    let path = config::locate(manifest)?;
    let manifest = Manifest::load(&path)?;
    let selected = manifest.select(releases)?;

    let engine = ReconciliationEngine::new(
        SystemRunner::new(),
        manifest.settings.engine_options(overrides),
    );
    tracing::debug!(manifest = %path.display(), releases = selected.len(), "reconciling");

    let mut results: Vec<ReconciliationResult> = Vec::with_capacity(selected.len());
    for spec in &selected {
        let result = engine.reconcile(spec);
        if !output_json {
            display::print_result(spec, &result);
        }
        results.push(result);
    }

    if output_json {
        let labelled: Vec<LabelledResult<'_>> = selected
            .iter()
            .zip(&results)
            .map(|(spec, result)| LabelledResult {
                deploy_name: &spec.deploy_name,
                namespace: &spec.namespace,
                result,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&labelled)?);
    } else if !results.is_empty() {
        display::print_summary(&results);
    }

    let failed = results.iter().filter(|r| r.is_failed()).count();
    if failed > 0 {
        return Err(CliError::ReconcileFailed {
            failed,
            total: results.len(),
        });
    }
    Ok(())
}
