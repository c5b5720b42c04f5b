//! Chart version parsing and comparison
//!
//! Versions follow semantic-version precedence. Short forms (`1`, `1.2`) and a
//! leading `v` are accepted and normalized; build metadata never affects
//! ordering or equality.

use semver::Version;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// A normalized chart version
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChartVersion(Version);

impl ChartVersion {
    /// Parse a version, padding missing minor/patch components with zeros
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let unprefixed = trimmed
            .strip_prefix(['v', 'V'])
            .unwrap_or(trimmed);

        if unprefixed.is_empty() {
            return Err(invalid(input, "empty version"));
        }

        let split = unprefixed.find(['-', '+']).unwrap_or(unprefixed.len());
        let (core, suffix) = unprefixed.split_at(split);

        let parts: Vec<&str> = core.split('.').collect();
        let numeric = parts
            .iter()
            .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()));
        if parts.len() > 3 || !numeric {
            return Err(invalid(
                input,
                "expected MAJOR[.MINOR[.PATCH]] with numeric components",
            ));
        }

        let mut padded = parts.join(".");
        for _ in parts.len()..3 {
            padded.push_str(".0");
        }
        padded.push_str(suffix);

        Version::parse(&padded)
            .map(Self)
            .map_err(|e| invalid(input, &e.to_string()))
    }

    /// Parse a strict `MAJOR.MINOR.PATCH[-PRE][+BUILD]` version
    pub fn parse_strict(input: &str) -> Result<Self> {
        Version::parse(input)
            .map(Self)
            .map_err(|e| invalid(input, &e.to_string()))
    }

    /// The underlying semantic version
    pub fn as_semver(&self) -> &Version {
        &self.0
    }

    /// `0`, `0.0` and `0.0.0` mean "no explicit constraint"
    pub fn is_zero(&self) -> bool {
        self.0.major == 0 && self.0.minor == 0 && self.0.patch == 0 && self.0.pre.is_empty()
    }
}

fn invalid(version: &str, reason: &str) -> CoreError {
    CoreError::InvalidVersion {
        version: version.to_string(),
        reason: reason.to_string(),
    }
}

impl PartialEq for ChartVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ChartVersion {}

impl PartialOrd for ChartVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ChartVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (&self.0, &other.0);
        (a.major, a.minor, a.patch)
            .cmp(&(b.major, b.minor, b.patch))
            .then_with(|| a.pre.cmp(&b.pre))
    }
}

impl fmt::Display for ChartVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChartVersion {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ChartVersion {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ChartVersion> for String {
    fn from(version: ChartVersion) -> Self {
        version.to_string()
    }
}

/// The version a release should converge to
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DesiredVersion {
    /// No explicit constraint: whatever the chart source resolves to
    #[default]
    Latest,

    /// A specific chart version
    Exact(ChartVersion),
}

impl DesiredVersion {
    /// Interpret an optional raw version; absent, empty, `latest` and zero are wildcards
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        let Some(raw) = raw.map(str::trim) else {
            return Ok(Self::Latest);
        };
        if raw.is_empty() || raw.eq_ignore_ascii_case("latest") {
            return Ok(Self::Latest);
        }

        let version = ChartVersion::parse(raw)?;
        if version.is_zero() {
            Ok(Self::Latest)
        } else {
            Ok(Self::Exact(version))
        }
    }

    /// The explicit version, if any
    pub fn exact(&self) -> Option<&ChartVersion> {
        match self {
            Self::Latest => None,
            Self::Exact(v) => Some(v),
        }
    }

    pub fn is_latest(&self) -> bool {
        matches!(self, Self::Latest)
    }
}

impl fmt::Display for DesiredVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => write!(f, "latest"),
            Self::Exact(v) => write!(f, "{}", v),
        }
    }
}

/// Compare two optional versions.
///
/// Wildcards (absent or zero) compare equal to each other and below any
/// explicit version. Decision logic must check for wildcards itself rather
/// than rely on this ordering.
pub fn compare(a: Option<&str>, b: Option<&str>) -> Result<Ordering> {
    let a = DesiredVersion::parse(a)?;
    let b = DesiredVersion::parse(b)?;

    Ok(match (a.exact(), b.exact()) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.cmp(y),
    })
}

/// Split a `<chart>-<version>` label as reported by list and history queries.
///
/// The first `-` whose suffix is a strict semantic version wins, so chart
/// names containing dashes and pre-release versions are both handled.
pub fn split_chart_label(label: &str) -> Option<(&str, ChartVersion)> {
    label.match_indices('-').find_map(|(idx, _)| {
        let (name, rest) = (&label[..idx], &label[idx + 1..]);
        if name.is_empty() || !rest.starts_with(|c: char| c.is_ascii_digit()) {
            return None;
        }
        ChartVersion::parse_strict(rest).ok().map(|v| (name, v))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> ChartVersion {
        ChartVersion::parse(s).unwrap()
    }

    #[test]
    fn test_compare_release_versions() {
        assert_eq!(compare(Some("1.2.0"), Some("1.1.9")).unwrap(), Ordering::Greater);
        assert_eq!(compare(Some("1.2.0"), Some("1.2.0")).unwrap(), Ordering::Equal);
        assert_eq!(compare(Some("1.1.9"), Some("1.2.0")).unwrap(), Ordering::Less);
    }

    #[test]
    fn test_prerelease_sorts_below_release() {
        assert_eq!(compare(Some("1.0.0-rc1"), Some("1.0.0")).unwrap(), Ordering::Less);
        assert!(v("1.0.0-alpha") < v("1.0.0-beta"));
        assert!(v("1.0.0-rc.2") < v("1.0.0-rc.10"));
    }

    #[test]
    fn test_build_metadata_ignored() {
        assert_eq!(v("1.2.3+build.5"), v("1.2.3"));
        assert_eq!(compare(Some("1.2.3+a"), Some("1.2.3+b")).unwrap(), Ordering::Equal);
    }

    #[test]
    fn test_short_forms_are_padded() {
        assert_eq!(v("1"), v("1.0.0"));
        assert_eq!(v("1.2"), v("1.2.0"));
        assert_eq!(v("v2.3.4"), v("2.3.4"));
        assert_eq!(v("1.2-rc1").to_string(), "1.2.0-rc1");
    }

    #[test]
    fn test_malformed_versions_rejected() {
        for bad in ["abc", "1.2.3.4", "1..2", "1.x", "-1.0.0", "1.0.0-"] {
            let err = ChartVersion::parse(bad).unwrap_err();
            assert!(
                matches!(err, CoreError::InvalidVersion { .. }),
                "expected InvalidVersion for {bad}"
            );
        }
        assert!(compare(Some("nope"), Some("1.0.0")).is_err());
    }

    #[test]
    fn test_wildcard_versions() {
        assert!(DesiredVersion::parse(None).unwrap().is_latest());
        assert!(DesiredVersion::parse(Some("")).unwrap().is_latest());
        assert!(DesiredVersion::parse(Some("0")).unwrap().is_latest());
        assert!(DesiredVersion::parse(Some("0.0.0")).unwrap().is_latest());
        assert!(DesiredVersion::parse(Some("latest")).unwrap().is_latest());
        assert!(!DesiredVersion::parse(Some("0.0.1")).unwrap().is_latest());
        assert!(!DesiredVersion::parse(Some("0.0.0-rc1")).unwrap().is_latest());

        assert_eq!(DesiredVersion::Latest.to_string(), "latest");
        assert_eq!(compare(None, Some("0")).unwrap(), Ordering::Equal);
        assert_eq!(compare(None, Some("0.1.0")).unwrap(), Ordering::Less);
    }

    #[test]
    fn test_split_chart_label() {
        let (name, version) = split_chart_label("rook-ceph-0.8.0").unwrap();
        assert_eq!(name, "rook-ceph");
        assert_eq!(version, v("0.8.0"));

        let (name, version) = split_chart_label("my-chart-1.0.0-rc1").unwrap();
        assert_eq!(name, "my-chart");
        assert_eq!(version.to_string(), "1.0.0-rc1");

        let (name, version) = split_chart_label("app-2-1.4.0").unwrap();
        assert_eq!(name, "app-2");
        assert_eq!(version, v("1.4.0"));

        assert!(split_chart_label("nginx").is_none());
        assert!(split_chart_label("nginx-latest").is_none());
    }

    #[test]
    fn test_serde_roundtrip_normalizes() {
        let version: ChartVersion = serde_json::from_str("\"v1.2\"").unwrap();
        assert_eq!(serde_json::to_string(&version).unwrap(), "\"1.2.0\"");
        assert!(serde_json::from_str::<ChartVersion>("\"bogus\"").is_err());
    }
}
