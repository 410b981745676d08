//! npm registry client for Husk
//!
//! Fetches package metadata and tarballs over a pooled keep-alive connection,
//! following redirects by hand with a hop limit, retrying transport errors
//! with backoff and memoizing metadata for the length of a run.

pub mod api;
pub mod cache;
pub mod client;

// Re-export main types
pub use api::{DistInfo, PackageMetadata, VersionMetadata};
pub use cache::{CacheStats, MetadataCache};
pub use client::{encode_package_name, ClientOptions, RegistryClient, RetryConfig, MAX_REDIRECTS};

use husk_core::error::HuskError;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, HuskError>;
