//! Hashing utilities: store keys and tarball integrity.
//!
//! Store keys are Blake3 digests of `name@version`. Tarball integrity follows the
//! registry's Subresource Integrity strings (`sha512-<base64>`, `sha1-<base64>`)
//! and the legacy hex `shasum`.

use base64::{engine::general_purpose, Engine as _};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

use crate::error::{HuskError, HuskResult};

/// Compute Blake3 hash of data
pub fn blake3_hash(data: &[u8]) -> String {
    let hash = blake3::hash(data);
    hash.to_hex().to_string()
}

/// Deterministic store key for a package version
pub fn store_key(name: &str, version: &str) -> String {
    blake3_hash(format!("{}@{}", name, version).as_bytes())
}

/// Verify data against an SRI string or a hex sha1 shasum.
///
/// An empty expectation or an algorithm we do not know passes; the first
/// recognised hash in a multi-hash SRI string decides.
pub fn verify_integrity(package: &str, data: &[u8], expected: &str) -> HuskResult<()> {
    let expected = expected.trim();
    if expected.is_empty() {
        return Ok(());
    }

    for candidate in expected.split_whitespace() {
        let Some((algorithm, digest)) = candidate.split_once('-') else {
            continue;
        };
        let actual = match algorithm {
            "sha512" => general_purpose::STANDARD.encode(Sha512::digest(data)),
            "sha256" => general_purpose::STANDARD.encode(Sha256::digest(data)),
            "sha1" => general_purpose::STANDARD.encode(Sha1::digest(data)),
            _ => continue,
        };
        return check(package, digest, &actual);
    }

    if expected.len() == 40 && expected.chars().all(|c| c.is_ascii_hexdigit()) {
        let actual = hex::encode(Sha1::digest(data));
        return check(package, &expected.to_ascii_lowercase(), &actual);
    }

    Ok(())
}

fn check(package: &str, expected: &str, actual: &str) -> HuskResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(HuskError::IntegrityFailure {
            package: package.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

/// Build a `sha512-` SRI string for data
pub fn sri_sha512(data: &[u8]) -> String {
    format!("sha512-{}", general_purpose::STANDARD.encode(Sha512::digest(data)))
}
