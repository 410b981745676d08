//! Dependency resolution engine for Husk
//!
//! Matches version ranges, walks the registry breadth-first with a depth
//! guard and one version per package name, and records the result as a
//! petgraph dependency graph.

pub mod graph;
pub mod resolver;
pub mod semver;

// Re-export main types
pub use graph::{DependencyEdge, DependencyGraph, PackageNode};
pub use resolver::{DependencyResolver, Resolution, ResolveOptions, ResolveWarning, MAX_DEPTH};
pub use semver::{find_best_version, satisfies, VersionSelector};

use husk_core::error::HuskError;

/// Result type for resolver operations
pub type ResolverResult<T> = Result<T, HuskError>;
