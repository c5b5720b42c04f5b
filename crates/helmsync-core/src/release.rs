//! Observed release state

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::version::ChartVersion;

/// Release status as reported by the package manager
///
/// Raw statuses are lower-cased and mapped onto this fixed vocabulary;
/// anything unrecognized becomes `Unknown` instead of failing.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ReleaseStatus {
    Deployed,
    Deleted,
    Failed,
    PendingInstall,
    PendingUpgrade,
    #[default]
    Unknown,
}

impl ReleaseStatus {
    /// Map a raw status string onto the status vocabulary
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().to_lowercase().replace('_', "-").as_str() {
            "deployed" => Self::Deployed,
            "deleted" | "uninstalled" => Self::Deleted,
            "failed" => Self::Failed,
            "pending-install" => Self::PendingInstall,
            "pending-upgrade" => Self::PendingUpgrade,
            _ => Self::Unknown,
        }
    }

    /// Failed or mid-operation: neither cleanly deployed nor deleted
    pub fn is_unsettled(&self) -> bool {
        matches!(
            self,
            Self::Failed | Self::PendingInstall | Self::PendingUpgrade | Self::Unknown
        )
    }
}

impl std::fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Deployed => "deployed",
            Self::Deleted => "deleted",
            Self::Failed => "failed",
            Self::PendingInstall => "pending-install",
            Self::PendingUpgrade => "pending-upgrade",
            Self::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

impl<'de> Deserialize<'de> for ReleaseStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(|raw| Self::from_raw(&raw))
    }
}

/// One release as seen by an inventory query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedRelease {
    /// Release name
    pub name: String,

    /// Normalized status
    pub status: ReleaseStatus,

    /// Chart version of the current revision, when the chart label carries one
    #[serde(default)]
    pub deployed_version: Option<ChartVersion>,

    /// Current revision number
    #[serde(default)]
    pub revision: Option<u32>,

    /// Raw `<chart>-<version>` label
    #[serde(default)]
    pub chart: Option<String>,
}

impl ObservedRelease {
    pub fn new(name: impl Into<String>, status: ReleaseStatus) -> Self {
        Self {
            name: name.into(),
            status,
            deployed_version: None,
            revision: None,
            chart: None,
        }
    }

    /// Record the deployed chart version
    pub fn with_version(mut self, version: ChartVersion) -> Self {
        self.deployed_version = Some(version);
        self
    }
}

/// Releases in one namespace, keyed by name.
///
/// Taken once per reconciliation call and dropped afterwards. Duplicate
/// names keep the last observation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InventorySnapshot {
    namespace: String,
    releases: IndexMap<String, ObservedRelease>,
}

impl InventorySnapshot {
    /// An empty snapshot for a namespace
    pub fn empty(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            releases: IndexMap::new(),
        }
    }

    /// Build a snapshot; later entries replace earlier ones with the same name
    pub fn from_releases(
        namespace: impl Into<String>,
        releases: impl IntoIterator<Item = ObservedRelease>,
    ) -> Self {
        let mut snapshot = Self::empty(namespace);
        for release in releases {
            snapshot.releases.insert(release.name.clone(), release);
        }
        snapshot
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn get(&self, name: &str) -> Option<&ObservedRelease> {
        self.releases.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.releases.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.releases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    /// Releases in query order
    pub fn iter(&self) -> impl Iterator<Item = &ObservedRelease> {
        self.releases.values()
    }
}

/// One entry of a release's revision history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revision {
    pub revision: u32,

    /// Chart version deployed by this revision, if determinable
    #[serde(default)]
    pub version: Option<ChartVersion>,

    pub status: ReleaseStatus,
}

/// Revision history of a single release
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RevisionHistory {
    revisions: Vec<Revision>,
}

impl RevisionHistory {
    pub fn new(revisions: Vec<Revision>) -> Self {
        Self { revisions }
    }

    /// Most recent revision that deployed `version`.
    ///
    /// Several revisions may share a version; the highest revision number wins.
    pub fn latest_revision_of(&self, version: &ChartVersion) -> Option<u32> {
        self.revisions
            .iter()
            .filter(|r| r.version.as_ref() == Some(version))
            .map(|r| r.revision)
            .max()
    }

    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Revision> {
        self.revisions.iter()
    }
}
