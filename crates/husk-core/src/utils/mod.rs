//! Hashing helpers shared by the registry client and the store.

pub mod hash;

pub use hash::{blake3_hash, sri_sha512, store_key, verify_integrity};
