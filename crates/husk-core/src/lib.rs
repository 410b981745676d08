//! # husk-core
//!
//! Core types and utilities shared across all Husk crates.
//!
//! This crate provides:
//! - `Version` and `VersionReq` with the numeric matching rules the installer uses
//! - `PackageRef` and `ResolvedPackage` describing manifest entries and resolution output
//! - `HuskError` for unified error handling
//! - Integrity checking and store-key hashing
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (Version, ResolvedPackage, etc.)
//! - `error`: Error types and result aliases
//! - `utils`: Utility functions and helpers

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{HuskError, HuskResult};
pub use types::{DependencyKind, LinkMode, PackageRef, ResolvedPackage, Version, VersionReq};
