//! Package store for Husk
//!
//! This crate owns everything between a downloaded tarball and a usable
//! `node_modules`: gzip/tar extraction, the hash-keyed store of extracted
//! package trees with its JSON index, and the virtual-store linker.

pub mod cas;
pub mod link;
pub mod tarball;

// Re-export main types
pub use cas::{CasStore, EntryMeta, PruneReport, StoreEntry, StoreIndex, StoreStatus};
pub use link::{LinkReport, Linker, VIRTUAL_STORE_DIR};
pub use tarball::{decompress, extract, unpack, UnpackStats};

use husk_core::error::HuskError;

/// Result type for store operations
pub type CacheResult<T> = Result<T, HuskError>;

#[cfg(test)]
pub(crate) mod test_support {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tar::{Builder, Header};

    /// Gzipped tar with every file under `package/`, like the registry serves
    pub fn npm_tarball(files: &[(&str, &str)]) -> Vec<u8> {
        let mut builder = Builder::new(Vec::new());
        for (path, body) in files {
            let mut header = Header::new_gnu();
            header.set_size(body.len() as u64);
            header.set_mode(0o644);
            builder
                .append_data(&mut header, format!("package/{}", path), body.as_bytes())
                .unwrap();
        }
        let tar_bytes = builder.into_inner().unwrap();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&tar_bytes).unwrap();
        encoder.finish().unwrap()
    }
}
