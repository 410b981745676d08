//! # husk-lockfile
//!
//! `husk-lock.json` records the exact package set of the last successful
//! install:
//!
//! ```json
//! {
//!   "lockfileVersion": 1,
//!   "packages": {
//!     "react@18.2.0": {
//!       "version": "18.2.0",
//!       "integrity": "sha512-...",
//!       "dependencies": { "loose-envify": "^1.1.0" },
//!       "tarballUrl": "https://registry.npmjs.org/react/-/react-18.2.0.tgz"
//!     }
//!   }
//! }
//! ```
//!
//! Keys are sorted and the file ends with a newline, so identical installs
//! produce byte-identical lockfiles. A lockfile is only an optimization:
//! anything unreadable is treated as absent.

use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use husk_core::error::{HuskError, HuskResult};
use husk_core::types::{PackageRef, ResolvedPackage, Version, VersionReq};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const LOCKFILE_NAME: &str = "husk-lock.json";
pub const LOCKFILE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockedPackage {
    pub version: String,
    #[serde(default)]
    pub integrity: String,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tarball_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lockfile {
    pub lockfile_version: u32,
    #[serde(default)]
    pub packages: BTreeMap<String, LockedPackage>,
}

impl Default for Lockfile {
    fn default() -> Self {
        Self {
            lockfile_version: LOCKFILE_VERSION,
            packages: BTreeMap::new(),
        }
    }
}

/// Path of the lockfile inside a project
pub fn lockfile_path(project_dir: &Path) -> PathBuf {
    project_dir.join(LOCKFILE_NAME)
}

/// Split a `name@version` key; the leading `@` of a scope is not a separator
pub fn split_key(key: &str) -> Option<(&str, &str)> {
    let at = key.rfind('@').filter(|idx| *idx > 0)?;
    Some((&key[..at], &key[at + 1..]))
}

impl Lockfile {
    /// Build a lockfile from resolved packages
    pub fn from_resolved<'a, I>(packages: I) -> Self
    where
        I: IntoIterator<Item = &'a ResolvedPackage>,
    {
        let packages = packages
            .into_iter()
            .map(|package| {
                let mut dependencies = package.dependencies.clone();
                for (name, range) in &package.optional_dependencies {
                    dependencies.entry(name.clone()).or_insert_with(|| range.clone());
                }
                let locked = LockedPackage {
                    version: package.version.to_string(),
                    integrity: package.integrity.clone(),
                    dependencies,
                    tarball_url: Some(package.tarball_url.clone()).filter(|url| !url.is_empty()),
                };
                (package.id(), locked)
            })
            .collect();

        Self {
            lockfile_version: LOCKFILE_VERSION,
            packages,
        }
    }

    /// Parse lockfile text
    pub fn parse(content: &str) -> HuskResult<Self> {
        let lockfile: Lockfile = serde_json::from_str(content).map_err(|e| HuskError::JsonParse {
            message: format!("{}: {}", LOCKFILE_NAME, e),
        })?;
        if lockfile.lockfile_version != LOCKFILE_VERSION {
            return Err(HuskError::JsonParse {
                message: format!(
                    "{}: unsupported lockfileVersion {}",
                    LOCKFILE_NAME, lockfile.lockfile_version
                ),
            });
        }
        Ok(lockfile)
    }

    /// Read the project's lockfile; missing or malformed is `None`
    pub fn load(project_dir: &Path) -> Option<Self> {
        let path = lockfile_path(project_dir);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("could not read {}: {}", path.display(), e);
                return None;
            },
        };

        match Self::parse(&content) {
            Ok(lockfile) => {
                debug!("loaded {} with {} package(s)", path.display(), lockfile.len());
                Some(lockfile)
            },
            Err(e) => {
                warn!("ignoring {}: {}", path.display(), e);
                None
            },
        }
    }

    /// Deterministic JSON text with a trailing newline
    pub fn render(&self) -> String {
        let mut content = serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string());
        content.push('\n');
        content
    }

    /// Write the lockfile into `project_dir`
    pub fn save(&self, project_dir: &Path) -> HuskResult<PathBuf> {
        let path = lockfile_path(project_dir);
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, self.render())
            .map_err(|e| HuskError::io(format!("Failed to write {}", temp_path.display()), e))?;
        fs::rename(&temp_path, &path)
            .map_err(|e| HuskError::io(format!("Failed to replace {}", path.display()), e))?;
        Ok(path)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Locked entry for a package name
    pub fn get(&self, name: &str) -> Option<&LockedPackage> {
        self.packages
            .iter()
            .find(|(key, _)| split_key(key).map(|(n, _)| n == name).unwrap_or(false))
            .map(|(_, locked)| locked)
    }

    /// Check that every root is locked at a version its range accepts.
    ///
    /// Protocol specifiers (`file:`, git URLs) are never installable and are
    /// ignored here; dist-tags cannot be checked offline and fail the check.
    pub fn covers(&self, roots: &[PackageRef]) -> HuskResult<()> {
        for root in roots {
            let range = root.version_range.trim();
            if range.contains(':') || range.contains('/') {
                continue;
            }

            let Some(locked) = self.get(&root.name) else {
                return Err(HuskError::LockfileOutOfDate {
                    reason: format!("{} is not locked", root.name),
                });
            };
            let req = VersionReq::parse(range).map_err(|_| HuskError::LockfileOutOfDate {
                reason: format!("{}@{} cannot be checked without the registry", root.name, range),
            })?;
            let satisfied = locked
                .version
                .parse::<Version>()
                .map(|version| req.matches(&version))
                .unwrap_or(false);
            if !satisfied {
                return Err(HuskError::LockfileOutOfDate {
                    reason: format!("{} is locked at {} which does not satisfy {}", root.name, locked.version, range),
                });
            }
        }
        Ok(())
    }

    /// Only the packages reachable from `roots` through locked dependencies
    pub fn reachable_from(&self, roots: &[PackageRef]) -> Self {
        let mut kept = BTreeMap::new();
        let mut queue: VecDeque<String> = roots.iter().map(|r| r.name.clone()).collect();

        while let Some(name) = queue.pop_front() {
            let Some(key) = self
                .packages
                .keys()
                .find(|key| split_key(key).map(|(n, _)| n == name).unwrap_or(false))
            else {
                continue;
            };
            if kept.contains_key(key) {
                continue;
            }
            let locked = &self.packages[key];
            queue.extend(locked.dependencies.keys().cloned());
            kept.insert(key.clone(), locked.clone());
        }

        Self {
            lockfile_version: self.lockfile_version,
            packages: kept,
        }
    }

    /// Rebuild resolved packages, filling in conventional tarball URLs
    pub fn to_resolved(&self, registry: &str) -> BTreeMap<String, ResolvedPackage> {
        let mut resolved = BTreeMap::new();

        for (key, locked) in &self.packages {
            let Some((name, _)) = split_key(key) else {
                warn!("skipping malformed lockfile key {}", key);
                continue;
            };
            let Ok(version) = locked.version.parse::<Version>() else {
                warn!("skipping {} with unparsable version {:?}", key, locked.version);
                continue;
            };

            let tarball_url = locked
                .tarball_url
                .clone()
                .unwrap_or_else(|| ResolvedPackage::default_tarball_url(registry, name, &version));
            let mut package = ResolvedPackage::new(name.to_string(), version, locked.integrity.clone(), tarball_url);
            package.dependencies = locked.dependencies.clone();
            resolved.insert(name.to_string(), package);
        }

        resolved
    }
}
