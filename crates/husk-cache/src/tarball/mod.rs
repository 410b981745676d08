//! Tarball pipeline: gzip bytes in, extracted package tree out

pub mod decompress;
pub mod extract;

use std::path::Path;

pub use decompress::{decompress, trailer_size};
pub use extract::{extract, strip_wrapper, ExtractStats};

use crate::CacheResult;

/// Sizes recorded for a store entry
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UnpackStats {
    pub compressed_size: u64,
    pub original_size: u64,
    pub files: usize,
}

/// Decompress and extract a downloaded tarball into `dest_dir`
pub fn unpack(package: &str, gz: &[u8], dest_dir: &Path) -> CacheResult<UnpackStats> {
    let tar_bytes = decompress(package, gz)?;
    let extracted = extract(package, &tar_bytes, dest_dir)?;

    Ok(UnpackStats {
        compressed_size: gz.len() as u64,
        original_size: tar_bytes.len() as u64,
        files: extracted.files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::npm_tarball;
    use tempfile::tempdir;

    #[test]
    fn test_unpack_reports_sizes() {
        let gz = npm_tarball(&[("package.json", r#"{"name":"tiny"}"#), ("index.js", "module.exports = {};")]);
        let temp_dir = tempdir().unwrap();

        let stats = unpack("tiny", &gz, temp_dir.path()).unwrap();

        assert_eq!(stats.files, 2);
        assert_eq!(stats.compressed_size, gz.len() as u64);
        assert_eq!(Some(stats.original_size as usize), trailer_size(&gz));
        assert!(temp_dir.path().join("index.js").is_file());
    }
}
