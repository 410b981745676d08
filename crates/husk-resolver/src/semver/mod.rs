//! Range matching and best-version selection
//!
//! Thin layer over `husk_core::types::{Version, VersionReq}` that the resolver
//! and the lockfile fast path share.

use std::collections::BTreeSet;

use husk_core::types::{Version, VersionReq};

/// Whether `version` satisfies `range`. Unparsable ranges match nothing.
pub fn satisfies(version: &str, range: &str) -> bool {
    match (version.parse::<Version>(), VersionReq::parse(range)) {
        (Ok(version), Ok(req)) => req.matches(&version),
        _ => false,
    }
}

/// Highest candidate satisfying `range`.
///
/// Candidates with the same numeric core are ordered release first, then by
/// prerelease tag and build metadata, so the pick never depends on input order.
pub fn find_best_version<'a, I>(candidates: I, range: &VersionReq) -> Option<Version>
where
    I: IntoIterator<Item = &'a Version>,
{
    candidates
        .into_iter()
        .filter(|version| range.matches(version))
        .max()
        .cloned()
}

/// Sorted view over a package's published versions
#[derive(Debug, Clone, Default)]
pub struct VersionSelector {
    available_versions: BTreeSet<Version>,
}

impl VersionSelector {
    pub fn new(versions: impl IntoIterator<Item = Version>) -> Self {
        Self {
            available_versions: versions.into_iter().collect(),
        }
    }

    /// Highest version matching every constraint
    pub fn select_best(&self, constraints: &[VersionReq]) -> Option<Version> {
        self.available_versions
            .iter()
            .rev()
            .find(|version| constraints.iter().all(|req| req.matches(version)))
            .cloned()
    }

    /// All versions matching a constraint, ascending
    pub fn find_matching(&self, constraint: &VersionReq) -> Vec<Version> {
        self.available_versions
            .iter()
            .filter(|version| constraint.matches(version))
            .cloned()
            .collect()
    }

    pub fn highest_version(&self) -> Option<&Version> {
        self.available_versions.iter().next_back()
    }

    pub fn len(&self) -> usize {
        self.available_versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.available_versions.is_empty()
    }
}
