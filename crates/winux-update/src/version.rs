//! Lenient dotted version comparison
//!
//! Release tags are compared as `major.minor.patch` triples. Parsing never
//! fails: a leading `v` is stripped, missing components count as 0, and a
//! component without leading digits also counts as 0. Components past the
//! third are ignored.

use std::cmp::Ordering;
use std::fmt;

/// A parsed `major.minor.patch` triple
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReleaseVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl ReleaseVersion {
    /// Parse a version string, defaulting anything unreadable to 0
    pub fn parse_lenient(version: &str) -> Self {
        let mut components = strip_v_prefix(version.trim())
            .split('.')
            .map(parse_component);

        Self {
            major: components.next().unwrap_or(0),
            minor: components.next().unwrap_or(0),
            patch: components.next().unwrap_or(0),
        }
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Strip a single leading `v` or `V` from a tag
pub fn strip_v_prefix(version: &str) -> &str {
    version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .unwrap_or(version)
}

/// Leading decimal digits of a component, so `3-beta` reads as 3
fn parse_component(component: &str) -> u64 {
    let digits_end = component
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(component.len());
    component[..digits_end].parse().unwrap_or(0)
}

/// Compare two version strings component by component
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    ReleaseVersion::parse_lenient(a).cmp(&ReleaseVersion::parse_lenient(b))
}

/// Whether `latest` is strictly newer than `current`
pub fn is_newer(latest: &str, current: &str) -> bool {
    compare_versions(latest, current) == Ordering::Greater
}
