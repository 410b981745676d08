//! Resolved package records.
//!
//! A `ResolvedPackage` is produced once per unique name during a resolution pass
//! (from the registry or from a lockfile) and stays immutable for the rest of the
//! install run.

use super::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A package pinned to a concrete version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPackage {
    pub name: String,
    pub version: Version,
    pub integrity: String,
    pub tarball_url: String,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub peer_dependencies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub optional_dependencies: BTreeMap<String, String>,
}

impl ResolvedPackage {
    /// Create a resolved package without dependency information
    pub fn new(name: String, version: Version, integrity: String, tarball_url: String) -> Self {
        Self {
            name,
            version,
            integrity,
            tarball_url,
            dependencies: BTreeMap::new(),
            peer_dependencies: BTreeMap::new(),
            optional_dependencies: BTreeMap::new(),
        }
    }

    /// `name@version`, the key used by the lockfile and the store
    pub fn id(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    /// Dependencies the resolver walks into (regular and optional)
    pub fn installable_dependencies(&self) -> impl Iterator<Item = (&String, &String)> {
        self.dependencies
            .iter()
            .chain(self.optional_dependencies.iter())
    }

    /// Conventional tarball location: `<registry>/<name>/-/<basename>-<version>.tgz`
    pub fn default_tarball_url(registry: &str, name: &str, version: &Version) -> String {
        let basename = name.rsplit('/').next().unwrap_or(name);
        format!(
            "{}/{}/-/{}-{}.tgz",
            registry.trim_end_matches('/'),
            name,
            basename,
            version
        )
    }

    /// Check if this is a valid npm package name (optionally scoped)
    pub fn is_valid_name(name: &str) -> bool {
        let valid_part = |part: &str| {
            !part.is_empty()
                && !part.starts_with('.')
                && part
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "-_.~".contains(c))
        };

        match name.strip_prefix('@') {
            Some(scoped) => match scoped.split_once('/') {
                Some((scope, pkg)) => valid_part(scope) && valid_part(pkg),
                None => false,
            },
            None => valid_part(name) && name.len() <= 214,
        }
    }
}
