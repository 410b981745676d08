//! On-disk store index
//!
//! A single JSON document describing every package version the store holds.
//! It is read and rewritten whole; writes go to a sibling temp file and are
//! renamed into place.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use husk_core::error::HuskError;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::CacheResult;

pub const INDEX_FORMAT_VERSION: u32 = 1;

/// Metadata for one extracted package version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreEntry {
    pub package_name: String,
    pub version: String,
    #[serde(default)]
    pub integrity: String,
    #[serde(default)]
    pub compressed_size: u64,
    #[serde(default)]
    pub original_size: u64,
    #[serde(default = "default_dictionary")]
    pub dictionary: String,
    pub extracted_path: String,
}

fn default_dictionary() -> String {
    "generic".to_string()
}

impl StoreEntry {
    pub fn key(&self) -> String {
        entry_key(&self.package_name, &self.version)
    }
}

/// Lookup key used for in-memory maps
pub fn entry_key(name: &str, version: &str) -> String {
    format!("{}@{}", name, version)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageVersions {
    #[serde(default)]
    pub versions: BTreeMap<String, StoreEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreIndex {
    pub version: u32,
    #[serde(default)]
    pub packages: BTreeMap<String, PackageVersions>,
}

impl Default for StoreIndex {
    fn default() -> Self {
        Self {
            version: INDEX_FORMAT_VERSION,
            packages: BTreeMap::new(),
        }
    }
}

impl StoreIndex {
    /// Read the index at `path`.
    ///
    /// A missing file is an empty index. So is an unreadable or malformed one:
    /// the store can always be rebuilt by reinstalling.
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                warn!("could not read store index {}: {}", path.display(), e);
                return Self::default();
            },
        };

        match serde_json::from_str::<StoreIndex>(&content) {
            Ok(index) if index.version == INDEX_FORMAT_VERSION => index,
            Ok(index) => {
                warn!(
                    "ignoring store index {} with unknown version {}",
                    path.display(),
                    index.version
                );
                Self::default()
            },
            Err(e) => {
                warn!("ignoring malformed store index {}: {}", path.display(), e);
                Self::default()
            },
        }
    }

    /// Write the index atomically
    pub fn save(&self, path: &Path) -> CacheResult<()> {
        let mut content = serde_json::to_string_pretty(self).map_err(|e| {
            HuskError::io(
                "Failed to serialize store index".to_string(),
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })?;
        content.push('\n');

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| HuskError::io("Failed to create index directory".to_string(), e))?;
        }

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, content)
            .map_err(|e| HuskError::io(format!("Failed to write {}", temp_path.display()), e))?;
        fs::rename(&temp_path, path)
            .map_err(|e| HuskError::io(format!("Failed to replace {}", path.display()), e))?;
        Ok(())
    }

    pub fn get(&self, name: &str, version: &str) -> Option<&StoreEntry> {
        self.packages.get(name)?.versions.get(version)
    }

    pub fn insert(&mut self, entry: StoreEntry) {
        self.packages
            .entry(entry.package_name.clone())
            .or_default()
            .versions
            .insert(entry.version.clone(), entry);
    }

    pub fn remove(&mut self, name: &str, version: &str) -> Option<StoreEntry> {
        let versions = &mut self.packages.get_mut(name)?.versions;
        let removed = versions.remove(version);
        if versions.is_empty() {
            self.packages.remove(name);
        }
        removed
    }

    pub fn entries(&self) -> impl Iterator<Item = &StoreEntry> {
        self.packages.values().flat_map(|p| p.versions.values())
    }

    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    pub fn version_count(&self) -> usize {
        self.packages.values().map(|p| p.versions.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(name: &str, version: &str) -> StoreEntry {
        StoreEntry {
            package_name: name.to_string(),
            version: version.to_string(),
            integrity: "sha512-abc".to_string(),
            compressed_size: 100,
            original_size: 400,
            dictionary: "javascript".to_string(),
            extracted_path: format!("/store/{}", version),
        }
    }

    #[test]
    fn test_insert_get_remove() {
        let mut index = StoreIndex::default();
        index.insert(entry("lodash", "4.17.21"));
        index.insert(entry("lodash", "4.17.20"));
        index.insert(entry("@types/node", "20.0.0"));

        assert_eq!(index.package_count(), 2);
        assert_eq!(index.version_count(), 3);
        assert_eq!(index.get("lodash", "4.17.21").unwrap().original_size, 400);

        assert!(index.remove("@types/node", "20.0.0").is_some());
        assert_eq!(index.package_count(), 1);
        assert!(index.remove("@types/node", "20.0.0").is_none());
    }

    #[test]
    fn test_json_shape() {
        let mut index = StoreIndex::default();
        index.insert(entry("react", "18.2.0"));

        let json: serde_json::Value = serde_json::to_value(&index).unwrap();
        assert_eq!(json["version"], 1);
        let stored = &json["packages"]["react"]["versions"]["18.2.0"];
        assert_eq!(stored["packageName"], "react");
        assert_eq!(stored["compressedSize"], 100);
        assert_eq!(stored["extractedPath"], "/store/18.2.0");
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("store").join("index.json");

        let mut index = StoreIndex::default();
        index.insert(entry("react", "18.2.0"));
        index.save(&path).unwrap();

        assert!(!path.with_extension("json.tmp").exists());
        assert!(fs::read_to_string(&path).unwrap().ends_with('\n'));
        assert_eq!(StoreIndex::load(&path), index);
    }

    #[test]
    fn test_missing_or_malformed_is_empty() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("index.json");
        assert_eq!(StoreIndex::load(&path), StoreIndex::default());

        fs::write(&path, "{ not json").unwrap();
        assert_eq!(StoreIndex::load(&path), StoreIndex::default());

        fs::write(&path, r#"{"version": 7, "packages": {}}"#).unwrap();
        assert_eq!(StoreIndex::load(&path).version, INDEX_FORMAT_VERSION);
    }

    #[test]
    fn test_missing_dictionary_defaults_to_generic() {
        let json = r#"{"packageName":"a","version":"1.0.0","extractedPath":"/x"}"#;
        let parsed: StoreEntry = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.dictionary, "generic");
        assert_eq!(parsed.key(), "a@1.0.0");
    }
}
