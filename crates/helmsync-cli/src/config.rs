//! Release manifest loading
//!
//! A manifest is a YAML document with an optional `settings` block and the
//! list of releases to converge:
//!
//! ```yaml
//! settings:
//!   kubeContext: kind-dev
//!   failedReleasePolicy: fail-fast
//! releases:
//!   - deployName: ceph
//!     namespace: rook
//!     version: 0.8.0
//!     chart:
//!       name: rook-ceph
//!       source: { type: local, path: ./charts/rook-ceph }
//! ```
//!
//! Relative chart and values paths are resolved against the manifest's
//! directory.

use helmsync_core::{ChartSource, ReleaseSpec};
use helmsync_engine::{EngineOptions, FailedReleasePolicy, FlagComposition};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{CliError, Result};

/// File name looked up when no manifest is given
pub const DEFAULT_MANIFEST: &str = "helmsync.yaml";

/// Engine settings declared in the manifest
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub helm_binary: Option<String>,
    pub kube_context: Option<String>,
    pub failed_release_policy: FailedReleasePolicy,
    pub flag_composition: FlagComposition,
}

/// Overrides from the command line and environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub helm_binary: Option<String>,
    pub kube_context: Option<String>,
    pub check: bool,
}

impl Settings {
    /// Engine options, command-line overrides winning over the manifest
    pub fn engine_options(&self, overrides: &Overrides) -> EngineOptions {
        let binary = overrides
            .helm_binary
            .clone()
            .or_else(|| self.helm_binary.clone())
            .unwrap_or_else(|| "helm".to_string());

        let mut options = EngineOptions::new(binary)
            .with_failed_release_policy(self.failed_release_policy)
            .with_flag_composition(self.flag_composition);
        if let Some(ctx) = overrides.kube_context.as_ref().or(self.kube_context.as_ref()) {
            options = options.with_kube_context(ctx);
        }
        if overrides.check {
            options = options.check_mode();
        }
        options
    }
}

/// Parsed manifest
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub releases: Vec<ReleaseSpec>,
}

impl Manifest {
    /// Load and check a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::manifest(format!("cannot read {}: {}", path.display(), e))
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&content, base)
            .map_err(|e| with_path(e, path))
    }

    /// Parse manifest text, resolving relative paths against `base`
    pub fn parse(content: &str, base: &Path) -> Result<Self> {
        let mut manifest: Manifest = serde_yaml::from_str(content)
            .map_err(|e| CliError::manifest(e.to_string()))?;

        let mut seen = HashSet::new();
        for spec in &mut manifest.releases {
            spec.validate().map_err(|e| CliError::manifest(e.to_string()))?;
            if !seen.insert((spec.namespace.clone(), spec.deploy_name.clone())) {
                return Err(CliError::manifest_with_help(
                    format!(
                        "release '{}' is declared twice in namespace '{}'",
                        spec.deploy_name, spec.namespace
                    ),
                    "Each release name must be unique within its namespace",
                ));
            }
            resolve_paths(spec, base);
        }

        Ok(manifest)
    }

    /// Releases named in `names`, in declaration order; all when empty
    pub fn select(&self, names: &[String]) -> Result<Vec<&ReleaseSpec>> {
        if let Some(unknown) = names
            .iter()
            .find(|n| !self.releases.iter().any(|r| &r.deploy_name == *n))
        {
            let known: Vec<&str> = self.releases.iter().map(|r| r.deploy_name.as_str()).collect();
            return Err(CliError::usage_with_help(
                format!("release '{}' is not declared in the manifest", unknown),
                format!("Declared releases: {}", known.join(", ")),
            ));
        }

        Ok(self
            .releases
            .iter()
            .filter(|r| names.is_empty() || names.contains(&r.deploy_name))
            .collect())
    }
}

fn with_path(err: CliError, path: &Path) -> CliError {
    match err {
        CliError::Manifest { message, help } => CliError::Manifest {
            message: format!("{}: {}", path.display(), message),
            help,
        },
        other => other,
    }
}

fn resolve_paths(spec: &mut ReleaseSpec, base: &Path) {
    if let ChartSource::Local { path } = &mut spec.chart.source
        && path.is_relative()
    {
        *path = base.join(&*path);
    }
    if let Some(values) = spec.values_file.as_mut().filter(|p| p.is_relative()) {
        *values = base.join(&*values);
    }
}

/// Manifest to use: the explicit one, `./helmsync.yaml`, or the user config one
pub fn locate(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let local = PathBuf::from(DEFAULT_MANIFEST);
    if local.is_file() {
        return Ok(local);
    }

    if let Some(user) = dirs::config_dir().map(|d| d.join("helmsync").join(DEFAULT_MANIFEST))
        && user.is_file()
    {
        return Ok(user);
    }

    Err(CliError::manifest_with_help(
        "no manifest found",
        format!(
            "Pass a manifest path, or create ./{} or ~/.config/helmsync/{}",
            DEFAULT_MANIFEST, DEFAULT_MANIFEST
        ),
    ))
}
