//! Desired release state

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::{CoreError, Result};
use crate::version::DesiredVersion;

/// Desired state of one release, as declared by the caller.
///
/// The engine only ever borrows a spec; it is never mutated during a
/// reconciliation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseSpec {
    /// Release name, unique within the namespace
    pub deploy_name: String,

    /// Chart identity and source
    pub chart: ChartRef,

    /// Target namespace
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Create the namespace on first install
    #[serde(default = "default_true")]
    pub create_namespace: bool,

    /// Desired chart version (absent or zero means latest)
    #[serde(default)]
    pub version: Option<String>,

    /// Rendered values file, already materialized on the executing host
    #[serde(default)]
    pub values_file: Option<PathBuf>,

    /// Individual `key=value` overrides, applied after the values file
    #[serde(default)]
    pub set_values: Vec<String>,

    /// Refresh a local chart's dependencies before installing or upgrading
    #[serde(default)]
    pub update_dependencies: bool,

    /// Whether the release should exist
    #[serde(default)]
    pub state: Lifecycle,

    /// Force resource replacement on upgrade
    #[serde(default)]
    pub force: bool,
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_true() -> bool {
    true
}

impl ReleaseSpec {
    /// Create a spec for a present release with default settings
    pub fn new(deploy_name: impl Into<String>, chart: ChartRef) -> Self {
        Self {
            deploy_name: deploy_name.into(),
            chart,
            namespace: default_namespace(),
            create_namespace: true,
            version: None,
            values_file: None,
            set_values: Vec::new(),
            update_dependencies: false,
            state: Lifecycle::Present,
            force: false,
        }
    }

    /// Set the target namespace
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Pin a chart version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Use a rendered values file
    pub fn with_values_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.values_file = Some(path.into());
        self
    }

    /// Declare the release absent
    pub fn absent(mut self) -> Self {
        self.state = Lifecycle::Absent;
        self
    }

    /// Request forced replacement on upgrade
    pub fn with_force(mut self) -> Self {
        self.force = true;
        self
    }

    /// Control namespace creation on install
    pub fn create_namespace(mut self, create: bool) -> Self {
        self.create_namespace = create;
        self
    }

    /// Parse the desired version (fails with `InvalidVersion`)
    pub fn desired_version(&self) -> Result<DesiredVersion> {
        DesiredVersion::parse(self.version.as_deref())
    }

    /// Check the spec for values the engine cannot act on
    pub fn validate(&self) -> Result<()> {
        let fail = |message: &str| {
            Err(CoreError::InvalidSpec {
                name: self.deploy_name.clone(),
                message: message.to_string(),
            })
        };

        if self.deploy_name.trim().is_empty() {
            return fail("deployName must not be empty");
        }
        if self.namespace.trim().is_empty() {
            return fail("namespace must not be empty");
        }
        if self.chart.name.trim().is_empty() {
            return fail("chart name must not be empty");
        }
        match &self.chart.source {
            ChartSource::Local { path } if path.as_os_str().is_empty() => {
                return fail("local chart path must not be empty");
            }
            ChartSource::Repo { name, url, .. } if name.is_empty() || url.is_empty() => {
                return fail("repository sources need both a name and a url");
            }
            _ => {}
        }
        if let Some(bad) = self.set_values.iter().find(|s| !s.contains('=')) {
            return fail(&format!("set value '{}' is not of the form key=value", bad));
        }

        self.desired_version().map(|_| ())
    }
}

/// Chart identity: a name plus where to fetch it from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartRef {
    /// Chart name (used as `repo/name` for repository sources)
    pub name: String,

    /// Chart source
    pub source: ChartSource,
}

impl ChartRef {
    /// A chart in a local directory or packaged archive
    pub fn local(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source: ChartSource::Local { path: path.into() },
        }
    }

    /// A chart served by a named repository
    pub fn repo(
        name: impl Into<String>,
        repo_name: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source: ChartSource::Repo {
                name: repo_name.into(),
                url: url.into(),
                credentials: None,
            },
        }
    }

    /// Attach repository credentials (no-op for local charts)
    pub fn with_credentials(mut self, credentials: RepoCredentials) -> Self {
        if let ChartSource::Repo { credentials: c, .. } = &mut self.source {
            *c = Some(credentials);
        }
        self
    }

    /// The chart argument passed to install/upgrade
    pub fn reference(&self) -> String {
        match &self.source {
            ChartSource::Local { path } => path.display().to_string(),
            ChartSource::Repo { name, .. } => format!("{}/{}", name, self.name),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self.source, ChartSource::Local { .. })
    }
}

/// Where a chart comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChartSource {
    /// Chart directory or archive on the executing host
    #[serde(alias = "directory")]
    Local { path: PathBuf },

    /// Named chart repository
    Repo {
        name: String,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        credentials: Option<RepoCredentials>,
    },
}

/// Basic-auth credentials for a chart repository
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoCredentials {
    pub username: String,
    pub password: String,
}

impl RepoCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for RepoCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepoCredentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// Desired lifecycle of a release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    #[default]
    Present,
    Absent,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => write!(f, "present"),
            Self::Absent => write!(f, "absent"),
        }
    }
}
