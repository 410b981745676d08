//! Registry response types
//!
//! Mirrors the abbreviated ("corgi") metadata document. Fields the installer
//! never reads are left out so full documents deserialize too.

use std::collections::{BTreeMap, HashMap};

use husk_core::types::{ResolvedPackage, Version};
use serde::{Deserialize, Serialize};

/// Package metadata document
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PackageMetadata {
    pub name: String,
    /// Tag name to version, e.g. `latest`
    #[serde(default, rename = "dist-tags")]
    pub dist_tags: HashMap<String, String>,
    /// All published versions keyed by version string
    #[serde(default)]
    pub versions: HashMap<String, VersionMetadata>,
}

/// One published version
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VersionMetadata {
    pub version: String,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, rename = "peerDependencies")]
    pub peer_dependencies: BTreeMap<String, String>,
    #[serde(default, rename = "optionalDependencies")]
    pub optional_dependencies: BTreeMap<String, String>,
    pub dist: DistInfo,
}

/// Distribution information for a tarball
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DistInfo {
    pub tarball: String,
    /// Legacy hex SHA-1
    #[serde(default)]
    pub shasum: Option<String>,
    /// Subresource integrity string
    #[serde(default)]
    pub integrity: Option<String>,
}

impl DistInfo {
    /// Strongest checksum published for this tarball, or empty when none is
    pub fn expected_integrity(&self) -> String {
        self.integrity
            .clone()
            .or_else(|| self.shasum.clone())
            .unwrap_or_default()
    }
}

impl PackageMetadata {
    /// Version strings that parse, paired with their parsed form
    pub fn candidate_versions(&self) -> Vec<Version> {
        self.versions
            .keys()
            .filter_map(|v| v.parse::<Version>().ok())
            .collect()
    }

    /// Metadata for an exact version
    pub fn version(&self, version: &Version) -> Option<&VersionMetadata> {
        self.versions.get(&version.to_string()).or_else(|| {
            self.versions
                .values()
                .find(|meta| meta.version.parse::<Version>().ok().as_ref() == Some(version))
        })
    }

    pub fn dist_tag(&self, tag: &str) -> Option<&str> {
        self.dist_tags.get(tag).map(String::as_str)
    }

    /// Pin `version` into a `ResolvedPackage`
    pub fn to_resolved(&self, version: &Version) -> Option<ResolvedPackage> {
        let meta = self.version(version)?;
        let mut resolved = ResolvedPackage::new(
            self.name.clone(),
            version.clone(),
            meta.dist.expected_integrity(),
            meta.dist.tarball.clone(),
        );
        resolved.dependencies = meta.dependencies.clone();
        resolved.peer_dependencies = meta.peer_dependencies.clone();
        resolved.optional_dependencies = meta.optional_dependencies.clone();
        Some(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PackageMetadata {
        serde_json::from_value(serde_json::json!({
            "name": "left-pad",
            "dist-tags": { "latest": "1.3.0" },
            "versions": {
                "1.3.0": {
                    "version": "1.3.0",
                    "dependencies": { "pad-core": "^2.0.0" },
                    "dist": {
                        "tarball": "https://registry.example/left-pad/-/left-pad-1.3.0.tgz",
                        "shasum": "5b8a3a7765dfe001261dde915589e782f8c94d1e",
                        "integrity": "sha512-abc"
                    }
                },
                "1.2.0": {
                    "version": "1.2.0",
                    "dist": { "tarball": "https://registry.example/left-pad/-/left-pad-1.2.0.tgz" }
                },
                "not-a-version": {
                    "version": "not-a-version",
                    "dist": { "tarball": "https://registry.example/x.tgz" }
                }
            },
            "time": { "created": "2016-01-01T00:00:00.000Z" }
        }))
        .unwrap()
    }

    #[test]
    fn test_deserialize_ignores_unknown_fields() {
        let meta = sample();
        assert_eq!(meta.dist_tag("latest"), Some("1.3.0"));
        assert_eq!(meta.versions.len(), 3);
    }

    #[test]
    fn test_expected_integrity_prefers_sri() {
        let meta = sample();
        let v130 = &meta.versions["1.3.0"];
        assert_eq!(v130.dist.expected_integrity(), "sha512-abc");

        let v120 = &meta.versions["1.2.0"];
        assert_eq!(v120.dist.expected_integrity(), "");
    }

    #[test]
    fn test_to_resolved() {
        let meta = sample();
        let resolved = meta.to_resolved(&Version::new(1, 3, 0)).unwrap();
        assert_eq!(resolved.id(), "left-pad@1.3.0");
        assert_eq!(resolved.dependencies.get("pad-core").unwrap(), "^2.0.0");
        assert!(meta.to_resolved(&Version::new(9, 9, 9)).is_none());
    }
}
