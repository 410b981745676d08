//! package.json parsing and in-place editing

use std::collections::{BTreeMap, HashSet};

use camino::{Utf8Path, Utf8PathBuf};
use husk_core::error::HuskError;
use husk_core::types::{DependencyKind, PackageRef};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ConfigResult;

/// The parts of package.json the installer reads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Runtime dependencies
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    /// Development dependencies
    #[serde(default, rename = "devDependencies")]
    pub dev_dependencies: BTreeMap<String, String>,

    /// Peer dependencies
    #[serde(default, rename = "peerDependencies")]
    pub peer_dependencies: BTreeMap<String, String>,

    /// Optional dependencies
    #[serde(default, rename = "optionalDependencies")]
    pub optional_dependencies: BTreeMap<String, String>,
}

/// Which manifest groups an install covers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DependencySelection {
    /// dependencies, optionalDependencies, peerDependencies and devDependencies
    #[default]
    All,
    /// Everything except devDependencies
    Production,
    /// devDependencies only
    DevOnly,
}

impl DependencySelection {
    fn includes(&self, kind: DependencyKind) -> bool {
        match self {
            DependencySelection::All => true,
            DependencySelection::Production => !kind.is_dev_only(),
            DependencySelection::DevOnly => kind.is_dev_only(),
        }
    }
}

impl PackageJson {
    /// Root dependencies for an install, one per name.
    ///
    /// Groups are visited as dependencies, optionalDependencies,
    /// peerDependencies, devDependencies; the first group naming a package wins.
    pub fn root_dependencies(&self, selection: DependencySelection) -> Vec<PackageRef> {
        let groups = [
            (&self.dependencies, DependencyKind::Normal),
            (&self.optional_dependencies, DependencyKind::Optional),
            (&self.peer_dependencies, DependencyKind::Peer),
            (&self.dev_dependencies, DependencyKind::Dev),
        ];

        let mut seen = HashSet::new();
        let mut roots = Vec::new();
        for (group, kind) in groups {
            if !selection.includes(kind) {
                continue;
            }
            for (name, range) in group {
                if seen.insert(name.clone()) {
                    roots.push(PackageRef::new(name, range).with_kind(kind));
                }
            }
        }
        roots
    }

    /// Whether any group declares `name`
    pub fn declares(&self, name: &str) -> bool {
        self.dependencies.contains_key(name)
            || self.dev_dependencies.contains_key(name)
            || self.peer_dependencies.contains_key(name)
            || self.optional_dependencies.contains_key(name)
    }
}

/// Parse package.json content
pub fn parse_package_json(content: &str) -> ConfigResult<PackageJson> {
    serde_json::from_str(content).map_err(|e| HuskError::JsonParse {
        message: format!("JSON parsing error: {}", e),
    })
}

/// Load package.json from file
pub async fn load_from_file(path: &Utf8Path) -> ConfigResult<PackageJson> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(HuskError::ManifestNotFound {
                path: path.to_string(),
            })
        },
        Err(e) => return Err(HuskError::io(format!("Failed to read {}", path), e)),
    };

    parse_package_json(&content).map_err(|e| match e {
        HuskError::JsonParse { message } => HuskError::JsonParse {
            message: format!("In file {}: {}", path, message),
        },
        other => other,
    })
}

/// Order-preserving editor for `add` and `remove`.
///
/// Works on the raw JSON document so fields the installer does not model
/// survive a rewrite untouched.
#[derive(Debug, Clone)]
pub struct ManifestEditor {
    path: Utf8PathBuf,
    document: Map<String, Value>,
}

const GROUPS: [&str; 4] = [
    "dependencies",
    "devDependencies",
    "peerDependencies",
    "optionalDependencies",
];

impl ManifestEditor {
    /// Open package.json for editing
    pub async fn open(path: &Utf8Path) -> ConfigResult<Self> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(HuskError::ManifestNotFound {
                    path: path.to_string(),
                })
            },
            Err(e) => return Err(HuskError::io(format!("Failed to read {}", path), e)),
        };
        Self::from_content(path, &content)
    }

    /// Build an editor from already-read content
    pub fn from_content(path: &Utf8Path, content: &str) -> ConfigResult<Self> {
        let value: Value = serde_json::from_str(content).map_err(|e| HuskError::JsonParse {
            message: format!("In file {}: {}", path, e),
        })?;

        match value {
            Value::Object(document) => Ok(Self {
                path: path.to_owned(),
                document,
            }),
            _ => Err(HuskError::JsonParse {
                message: format!("In file {}: top-level value must be an object", path),
            }),
        }
    }

    /// Set `name` to `range` in the chosen group.
    ///
    /// The package is dropped from the other install groups so it ends up
    /// declared exactly once.
    pub fn add_dependency(&mut self, name: &str, range: &str, dev: bool) {
        let target = if dev { "devDependencies" } else { "dependencies" };

        for group in GROUPS {
            if group != target && group != "peerDependencies" {
                self.remove_from_group(group, name);
            }
        }

        let entry = self
            .document
            .entry(target.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(map) = entry {
            map.insert(name.to_string(), Value::String(range.to_string()));
        }
    }

    /// Remove `name` from every group. Returns false when no group declared it.
    pub fn remove_dependency(&mut self, name: &str) -> bool {
        let mut removed = false;
        for group in GROUPS {
            removed |= self.remove_from_group(group, name);
        }
        removed
    }

    fn remove_from_group(&mut self, group: &str, name: &str) -> bool {
        match self.document.get_mut(group) {
            Some(Value::Object(map)) => map.shift_remove(name).is_some(),
            _ => false,
        }
    }

    /// Typed view of the edited document
    pub fn manifest(&self) -> ConfigResult<PackageJson> {
        serde_json::from_value(Value::Object(self.document.clone())).map_err(|e| {
            HuskError::JsonParse {
                message: format!("In file {}: {}", self.path, e),
            }
        })
    }

    /// Render with two-space indentation and a trailing newline
    pub fn render(&self) -> ConfigResult<String> {
        let mut out = serde_json::to_string_pretty(&self.document).map_err(|e| {
            HuskError::JsonParse {
                message: format!("JSON serialization error: {}", e),
            }
        })?;
        out.push('\n');
        Ok(out)
    }

    /// Write the document back to where it was read from
    pub async fn save(&self) -> ConfigResult<()> {
        let content = self.render()?;
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| HuskError::io(format!("Failed to write {}", self.path), e))
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}
