//! Gzip decompression
//!
//! libdeflate is tried first with an output buffer sized from the gzip
//! trailer. Anything it cannot handle in one shot (multi-member streams, a
//! trailer that lies, sizes past 4 GiB) goes through `flate2`'s streaming
//! decoder instead.

use std::io::Read;

use flate2::read::MultiGzDecoder;
use husk_core::error::HuskError;
use libdeflater::Decompressor;
use tracing::debug;

use crate::CacheResult;

/// Smallest valid gzip member: 10 byte header + empty deflate block + 8 byte trailer
const MIN_GZIP_LEN: usize = 18;
const MAX_DEFLATE_RATIO: usize = 1032;

/// Decompress a gzip stream into the raw tar bytes
pub fn decompress(package: &str, gz: &[u8]) -> CacheResult<Vec<u8>> {
    if let Some(out) = decompress_fast(gz) {
        return Ok(out);
    }

    debug!("libdeflate fast path declined for {}, streaming instead", package);
    decompress_streaming(package, gz)
}

/// Uncompressed size recorded in the gzip trailer (modulo 2^32)
pub fn trailer_size(gz: &[u8]) -> Option<usize> {
    if gz.len() < MIN_GZIP_LEN || gz[0] != 0x1f || gz[1] != 0x8b {
        return None;
    }
    let tail: [u8; 4] = gz[gz.len() - 4..].try_into().ok()?;
    Some(u32::from_le_bytes(tail) as usize)
}

fn decompress_fast(gz: &[u8]) -> Option<Vec<u8>> {
    let expected = trailer_size(gz)?;
    // Deflate cannot expand past ~1032:1; a bigger claim is a lie.
    if expected > gz.len().saturating_mul(MAX_DEFLATE_RATIO) {
        return None;
    }
    let mut out = vec![0u8; expected];
    let mut decompressor = Decompressor::new();

    match decompressor.gzip_decompress(gz, &mut out) {
        Ok(written) if written == expected => Some(out),
        _ => None,
    }
}

fn decompress_streaming(package: &str, gz: &[u8]) -> CacheResult<Vec<u8>> {
    let mut decoder = MultiGzDecoder::new(gz);
    let mut out = Vec::with_capacity(gz.len() * 4);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| HuskError::Extraction {
            package: package.to_string(),
            message: format!("gzip decompression failed: {}", e),
        })?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_fast_path_roundtrip() {
        let data = b"export default function () {}\n".repeat(200);
        let gz = gzip(&data);

        assert_eq!(trailer_size(&gz), Some(data.len()));
        assert_eq!(decompress_fast(&gz).unwrap(), data);
        assert_eq!(decompress("pkg", &gz).unwrap(), data);
    }

    #[test]
    fn test_multi_member_falls_back() {
        // Two concatenated members: the trailer only describes the second one.
        let mut gz = gzip(b"first member ");
        gz.extend(gzip(b"second"));

        let out = decompress("pkg", &gz).unwrap();
        assert_eq!(out, b"first member second");
    }

    #[test]
    fn test_lying_trailer_falls_back() {
        let data = b"some tar bytes".repeat(10);
        let mut gz = gzip(&data);
        let len = gz.len();
        gz[len - 4..].copy_from_slice(&3u32.to_le_bytes());

        assert!(decompress_fast(&gz).is_none());
        // The streaming decoder checks the trailer too, so this is a hard error.
        assert!(decompress("pkg", &gz).is_err());
    }

    #[test]
    fn test_garbage_is_extraction_error() {
        let err = decompress("broken-pkg", b"definitely not gzip data").unwrap_err();
        match err {
            HuskError::Extraction { package, .. } => assert_eq!(package, "broken-pkg"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_trailer_size_requires_magic() {
        assert_eq!(trailer_size(&[0u8; 32]), None);
        assert_eq!(trailer_size(&[0x1f, 0x8b]), None);
    }
}
