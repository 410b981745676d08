//! Package store on disk
//!
//! Extracted package trees live at `<root>/<2 hex>/<blake3(name@version)>`.
//! The in-memory entry map mirrors `index.json` and is written back with
//! [`CasStore::save_index`].

use std::fs;
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use dashmap::DashMap;
use husk_core::error::HuskError;
use husk_core::utils::store_key;
use tracing::debug;
use walkdir::WalkDir;

use super::index::{entry_key, StoreEntry, StoreIndex};
use crate::tarball::unpack;
use crate::CacheResult;

const INDEX_FILE: &str = "index.json";
const STAGING_DIR: &str = ".staging";

/// Facts about a tree being written into the store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryMeta {
    pub integrity: String,
    pub compressed_size: u64,
    pub original_size: u64,
    pub dictionary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStatus {
    pub packages: usize,
    pub versions: usize,
    pub compressed_size: u64,
    pub original_size: u64,
    /// Index entries whose directory is gone
    pub missing: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub stale_entries: usize,
    pub orphan_dirs: usize,
}

#[derive(Debug)]
pub struct CasStore {
    root: Utf8PathBuf,
    entries: DashMap<String, StoreEntry>,
}

impl CasStore {
    /// Open (creating if needed) the store rooted at `root`
    pub fn open<P: AsRef<Utf8Path>>(root: P) -> CacheResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .map_err(|e| HuskError::io(format!("Failed to create store directory {}", root), e))?;

        let index = StoreIndex::load(root.join(INDEX_FILE).as_std_path());
        let entries = DashMap::new();
        for entry in index.entries() {
            entries.insert(entry.key(), entry.clone());
        }
        debug!("opened store at {} with {} entries", root, entries.len());

        Ok(Self { root, entries })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn index_path(&self) -> Utf8PathBuf {
        self.root.join(INDEX_FILE)
    }

    /// Directory a package version is (or would be) stored in
    pub fn package_dir(&self, name: &str, version: &str) -> Utf8PathBuf {
        let key = store_key(name, version);
        self.root.join(&key[..2]).join(&key)
    }

    /// Indexed and still present on disk
    pub fn has(&self, name: &str, version: &str) -> bool {
        self.entries
            .get(&entry_key(name, version))
            .map(|entry| Path::new(&entry.extracted_path).is_dir())
            .unwrap_or(false)
    }

    pub fn entry(&self, name: &str, version: &str) -> Option<StoreEntry> {
        self.entries.get(&entry_key(name, version)).map(|e| e.clone())
    }

    /// Move an extracted tree into the store and index it
    pub fn write(
        &self,
        name: &str,
        version: &str,
        extracted_dir: &Path,
        meta: EntryMeta,
    ) -> CacheResult<StoreEntry> {
        let target = self.package_dir(name, version);
        if target.exists() {
            fs::remove_dir_all(&target)
                .map_err(|e| HuskError::io(format!("Failed to replace {}", target), e))?;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| HuskError::io(format!("Failed to create {}", parent), e))?;
        }

        if let Err(e) = fs::rename(extracted_dir, &target) {
            debug!("rename into store failed ({}), copying {}@{}", e, name, version);
            copy_tree(extracted_dir, target.as_std_path())?;
            let _ = fs::remove_dir_all(extracted_dir);
        }

        let entry = StoreEntry {
            package_name: name.to_string(),
            version: version.to_string(),
            integrity: meta.integrity,
            compressed_size: meta.compressed_size,
            original_size: meta.original_size,
            dictionary: meta.dictionary,
            extracted_path: target.to_string(),
        };
        self.entries.insert(entry.key(), entry.clone());
        Ok(entry)
    }

    /// Unpack a downloaded tarball and write the result into the store
    pub fn ingest(&self, name: &str, version: &str, integrity: &str, gz: &[u8]) -> CacheResult<StoreEntry> {
        let staging = self
            .root
            .join(STAGING_DIR)
            .join(format!("{}-{}", store_key(name, version), std::process::id()));
        if staging.exists() {
            let _ = fs::remove_dir_all(&staging);
        }

        let package = entry_key(name, version);
        let stats = match unpack(&package, gz, staging.as_std_path()) {
            Ok(stats) => stats,
            Err(e) => {
                let _ = fs::remove_dir_all(&staging);
                return Err(e);
            },
        };
        let dictionary = husk_dict::detect_package(staging.as_std_path());

        let meta = EntryMeta {
            integrity: integrity.to_string(),
            compressed_size: stats.compressed_size,
            original_size: stats.original_size,
            dictionary: dictionary.to_string(),
        };
        let result = self.write(name, version, staging.as_std_path(), meta);
        if result.is_err() {
            let _ = fs::remove_dir_all(&staging);
        }
        result
    }

    /// Snapshot of the index as it would be written
    pub fn read_index(&self) -> StoreIndex {
        let mut index = StoreIndex::default();
        for entry in self.entries.iter() {
            index.insert(entry.value().clone());
        }
        index
    }

    pub fn save_index(&self) -> CacheResult<()> {
        self.read_index().save(self.index_path().as_std_path())
    }

    pub fn status(&self) -> StoreStatus {
        let index = self.read_index();
        let mut status = StoreStatus {
            packages: index.package_count(),
            versions: index.version_count(),
            ..StoreStatus::default()
        };
        for entry in index.entries() {
            status.compressed_size += entry.compressed_size;
            status.original_size += entry.original_size;
            if !Path::new(&entry.extracted_path).is_dir() {
                status.missing += 1;
            }
        }
        status
    }

    /// Drop entries without a directory and directories without an entry
    pub fn prune(&self) -> CacheResult<PruneReport> {
        let mut report = PruneReport::default();

        self.entries.retain(|key, entry| {
            let present = Path::new(&entry.extracted_path).is_dir();
            if !present {
                debug!("pruning stale index entry {}", key);
                report.stale_entries += 1;
            }
            present
        });

        let referenced: std::collections::HashSet<String> = self
            .entries
            .iter()
            .map(|entry| entry.extracted_path.clone())
            .collect();

        for shard in self.shard_dirs()? {
            let children = fs::read_dir(&shard)
                .map_err(|e| HuskError::io(format!("Failed to read {}", shard), e))?;
            for child in children.flatten() {
                let Ok(path) = Utf8PathBuf::from_path_buf(child.path()) else {
                    continue;
                };
                if !referenced.contains(path.as_str()) {
                    debug!("pruning orphan store directory {}", path);
                    fs::remove_dir_all(&path)
                        .map_err(|e| HuskError::io(format!("Failed to remove {}", path), e))?;
                    report.orphan_dirs += 1;
                }
            }
            if fs::read_dir(&shard).map(|mut d| d.next().is_none()).unwrap_or(false) {
                let _ = fs::remove_dir(&shard);
            }
        }

        let staging = self.root.join(STAGING_DIR);
        if staging.exists() {
            let _ = fs::remove_dir_all(&staging);
        }

        self.save_index()?;
        Ok(report)
    }

    /// Remove every stored package and the index
    pub fn clear(&self) -> CacheResult<()> {
        for shard in self.shard_dirs()? {
            fs::remove_dir_all(&shard)
                .map_err(|e| HuskError::io(format!("Failed to remove {}", shard), e))?;
        }
        let staging = self.root.join(STAGING_DIR);
        if staging.exists() {
            fs::remove_dir_all(&staging)
                .map_err(|e| HuskError::io(format!("Failed to remove {}", staging), e))?;
        }
        let index_path = self.index_path();
        if index_path.exists() {
            fs::remove_file(&index_path)
                .map_err(|e| HuskError::io(format!("Failed to remove {}", index_path), e))?;
        }
        self.entries.clear();
        Ok(())
    }

    fn shard_dirs(&self) -> CacheResult<Vec<Utf8PathBuf>> {
        let read = fs::read_dir(&self.root)
            .map_err(|e| HuskError::io(format!("Failed to read {}", self.root), e))?;

        Ok(read
            .flatten()
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|entry| Utf8PathBuf::from_path_buf(entry.path()).ok())
            .filter(|path| {
                path.file_name()
                    .map(|n| n.len() == 2 && n.chars().all(|c| c.is_ascii_hexdigit()))
                    .unwrap_or(false)
            })
            .collect())
    }
}

fn copy_tree(source: &Path, dest: &Path) -> CacheResult<()> {
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(|e| {
            HuskError::io(
                format!("Failed to walk {}", source.display()),
                std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            )
        })?;
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .map_err(|e| HuskError::io(format!("Failed to create {}", target.display()), e))?;
        } else if entry.file_type().is_symlink() {
            let link = fs::read_link(entry.path())
                .map_err(|e| HuskError::io(format!("Failed to read {}", entry.path().display()), e))?;
            #[cfg(unix)]
            std::os::unix::fs::symlink(&link, &target)
                .map_err(|e| HuskError::io(format!("Failed to symlink {}", target.display()), e))?;
            #[cfg(not(unix))]
            tracing::warn!("dropping symlink {} -> {}", target.display(), link.display());
        } else {
            fs::copy(entry.path(), &target)
                .map_err(|e| HuskError::io(format!("Failed to copy {}", entry.path().display()), e))?;
        }
    }
    Ok(())
}
