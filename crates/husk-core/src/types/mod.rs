//! Core data types for Husk package management.
//!
//! This module provides the fundamental types used throughout the installer:
//! - Version types and range matching
//! - Resolved package records
//! - Manifest dependency references

pub mod dependency;
pub mod link_mode;
pub mod package;
pub mod version;

// Re-export all public types
pub use dependency::{DependencyKind, PackageRef};
pub use link_mode::LinkMode;
pub use package::ResolvedPackage;
pub use version::{Comparator, Op, PartialVersion, Version, VersionError, VersionReq};
