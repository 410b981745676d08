//! Per-run metadata memo
//!
//! A package name is fetched from the registry at most once per install run;
//! later lookups (a second `add`, the lockfile check, a repeated resolve in
//! tests) are answered from here.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::api::PackageMetadata;

/// In-memory metadata cache shared by clones of a `RegistryClient`
#[derive(Debug, Default)]
pub struct MetadataCache {
    entries: DashMap<String, Arc<PackageMetadata>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached metadata for `name`, counting the lookup
    pub fn get(&self, name: &str) -> Option<Arc<PackageMetadata>> {
        match self.entries.get(name) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(entry.value()))
            },
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            },
        }
    }

    /// Store metadata, returning the shared handle
    pub fn insert(&self, name: &str, metadata: PackageMetadata) -> Arc<PackageMetadata> {
        let metadata = Arc::new(metadata);
        self.entries.insert(name.to_string(), Arc::clone(&metadata));
        metadata
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
