//! Dependency declarations as read from a manifest.

use serde::{Deserialize, Serialize};

/// A `name` + `versionRange` pair declared in a manifest
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRef {
    pub name: String,
    pub version_range: String,
    #[serde(default)]
    pub kind: DependencyKind,
}

/// Type of dependency
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// Normal runtime dependency
    #[default]
    Normal,
    /// Development-only dependency
    Dev,
    /// Peer dependency (must be provided by consumer)
    Peer,
    /// Optional dependency (can be missing)
    Optional,
}

impl PackageRef {
    /// Create a new normal dependency
    pub fn new(name: impl Into<String>, version_range: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version_range: version_range.into(),
            kind: DependencyKind::Normal,
        }
    }

    /// Set the dependency kind
    pub fn with_kind(mut self, kind: DependencyKind) -> Self {
        self.kind = kind;
        self
    }

    /// Parse an `add` argument such as `lodash`, `lodash@^4` or `@types/node@20`
    pub fn parse_spec(spec: &str) -> Self {
        let spec = spec.trim();
        let split_at = if let Some(rest) = spec.strip_prefix('@') {
            rest.find('@').map(|idx| idx + 1)
        } else {
            spec.find('@')
        };

        match split_at {
            Some(idx) => PackageRef::new(&spec[..idx], &spec[idx + 1..]),
            None => PackageRef::new(spec, ""),
        }
    }

    /// Whether the spec left the range empty
    pub fn has_range(&self) -> bool {
        !self.version_range.trim().is_empty()
    }
}

impl DependencyKind {
    /// Check if this dependency is needed at runtime
    pub fn is_runtime(&self) -> bool {
        matches!(self, DependencyKind::Normal | DependencyKind::Optional)
    }

    /// Check if this dependency is only for development
    pub fn is_dev_only(&self) -> bool {
        matches!(self, DependencyKind::Dev)
    }

    /// Check if this dependency must be provided by the consumer
    pub fn is_peer(&self) -> bool {
        matches!(self, DependencyKind::Peer)
    }
}
