//! Level-by-level transitive resolution against the registry
//!
//! Root dependencies sit at depth 0. Each level is deduplicated by package
//! name, fetched in bounded concurrent batches, and only then is the next
//! level built from the newly resolved packages. A level deeper than the
//! configured maximum aborts the whole run before anything in it is fetched.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use futures_util::future::join_all;
use husk_core::error::HuskError;
use husk_core::types::{DependencyKind, PackageRef, ResolvedPackage, Version, VersionReq};
use husk_registry::{PackageMetadata, RegistryClient};
use tracing::{debug, info, warn};

use crate::graph::{DependencyEdge, DependencyGraph};
use crate::semver::find_best_version;
use crate::ResolverResult;

/// Deepest level that may still be fetched
pub const MAX_DEPTH: usize = 50;

#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Concurrent metadata fetches per batch
    pub concurrency: usize,
    pub max_depth: usize,
    /// Warn when a request's range excludes the version already chosen for its name
    pub warn_on_conflict: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            concurrency: (num_cpus::get() * 4).clamp(1, 32),
            max_depth: MAX_DEPTH,
            warn_on_conflict: false,
        }
    }
}

/// A package that was left out of the resolution, and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveWarning {
    pub package: String,
    pub message: String,
}

impl fmt::Display for ResolveWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.package, self.message)
    }
}

/// Outcome of a resolution pass
#[derive(Debug, Default)]
pub struct Resolution {
    /// One entry per package name
    pub packages: BTreeMap<String, ResolvedPackage>,
    pub warnings: Vec<ResolveWarning>,
    pub graph: DependencyGraph,
    /// Names of root dependencies that resolved
    pub roots: Vec<String>,
}

#[derive(Debug, Clone)]
struct Request {
    name: String,
    range: String,
    kind: DependencyKind,
    depth: usize,
    parent: Option<String>,
}

pub struct DependencyResolver {
    registry: RegistryClient,
    options: ResolveOptions,
}

impl DependencyResolver {
    pub fn new(registry: RegistryClient, options: ResolveOptions) -> Self {
        Self { registry, options }
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Resolve `roots` and everything they transitively need
    pub async fn resolve(&self, roots: &[PackageRef]) -> ResolverResult<Resolution> {
        let mut resolution = Resolution::default();
        let mut failed: HashSet<String> = HashSet::new();
        let mut edges: Vec<(Option<String>, String, DependencyEdge)> = Vec::new();
        let batch_size = self.options.concurrency.max(1);

        let mut level: Vec<Request> = roots
            .iter()
            .map(|root| Request {
                name: root.name.clone(),
                range: root.version_range.clone(),
                kind: root.kind,
                depth: 0,
                parent: None,
            })
            .collect();

        while !level.is_empty() {
            let depth = level[0].depth;
            let mut claimed: HashSet<String> = HashSet::new();
            let mut pending = Vec::new();

            for request in level {
                edges.push((
                    request.parent.clone(),
                    request.name.clone(),
                    DependencyEdge {
                        range: request.range.clone(),
                        kind: request.kind,
                    },
                ));

                if resolution.packages.contains_key(&request.name)
                    || failed.contains(&request.name)
                    || !claimed.insert(request.name.clone())
                {
                    continue;
                }
                pending.push(request);
            }

            if pending.is_empty() {
                break;
            }

            if depth > self.options.max_depth {
                let chain = pending
                    .iter()
                    .find_map(|r| r.parent.as_ref().map(|p| format!("{} -> {}", p, r.name)))
                    .unwrap_or_else(|| pending[0].name.clone());
                return Err(HuskError::DepthLimitExceeded {
                    package: chain,
                    limit: self.options.max_depth,
                });
            }

            debug!("resolving {} package(s) at depth {}", pending.len(), depth);
            let mut next_level = Vec::new();

            for batch in pending.chunks(batch_size) {
                let results =
                    join_all(batch.iter().map(|req| self.resolve_one(&req.name, &req.range))).await;

                for (request, result) in batch.iter().zip(results) {
                    match result {
                        Ok(package) => {
                            debug!("resolved {}", package.id());
                            for (dep_name, dep_range) in &package.dependencies {
                                next_level.push(child(&package, dep_name, dep_range, DependencyKind::Normal, depth));
                            }
                            for (dep_name, dep_range) in &package.optional_dependencies {
                                if !package.dependencies.contains_key(dep_name) {
                                    next_level.push(child(&package, dep_name, dep_range, DependencyKind::Optional, depth));
                                }
                            }
                            if request.parent.is_none() {
                                resolution.roots.push(package.name.clone());
                            }
                            resolution.graph.add_package(&package.name, package.version.clone());
                            resolution.packages.insert(package.name.clone(), package);
                        },
                        Err(error) => {
                            warn!("skipping {}@{}: {}", request.name, request.range, error);
                            failed.insert(request.name.clone());
                            resolution.warnings.push(ResolveWarning {
                                package: request.name.clone(),
                                message: error.to_string(),
                            });
                        },
                    }
                }
            }

            level = next_level;
        }

        self.finish_graph(&mut resolution, edges);

        for cycle in resolution.graph.cycles() {
            debug!("dependency cycle: {}", DependencyGraph::format_cycle(&cycle));
        }
        info!(
            "resolved {} package(s) with {} warning(s)",
            resolution.packages.len(),
            resolution.warnings.len()
        );

        Ok(resolution)
    }

    fn finish_graph(
        &self,
        resolution: &mut Resolution,
        edges: Vec<(Option<String>, String, DependencyEdge)>,
    ) {
        for (parent, name, edge) in edges {
            let Some(chosen) = resolution.packages.get(&name) else {
                continue;
            };

            if self.options.warn_on_conflict {
                if let Ok(req) = VersionReq::parse(&edge.range) {
                    if !req.matches(&chosen.version) {
                        let requester = parent.as_deref().unwrap_or("package.json");
                        let message = format!(
                            "{} wants {} but {} was already chosen",
                            requester, edge.range, chosen.version
                        );
                        warn!("version conflict for {}: {}", name, message);
                        resolution.warnings.push(ResolveWarning {
                            package: name.clone(),
                            message,
                        });
                    }
                }
            }

            if let Some(parent) = parent {
                if resolution.packages.contains_key(&parent) {
                    // Both endpoints exist, so this cannot fail.
                    let _ = resolution.graph.add_dependency(&parent, &name, edge);
                }
            }
        }
    }

    /// Resolve a single name/range pair to a concrete package
    pub async fn resolve_one(&self, name: &str, range: &str) -> ResolverResult<ResolvedPackage> {
        let req = match VersionReq::parse(range) {
            Ok(req) => Some(req),
            Err(_) if is_tag_name(range) => None,
            Err(_) => {
                return Err(HuskError::UnsupportedRange {
                    name: name.to_string(),
                    range: range.to_string(),
                })
            },
        };

        let metadata = self.registry.fetch_metadata(name).await?;
        let version = select_version(&metadata, name, range, req.as_ref())?;

        metadata
            .to_resolved(&version)
            .ok_or_else(|| HuskError::NoMatchingVersion {
                name: name.to_string(),
                range: range.to_string(),
            })
    }
}

fn child(parent: &ResolvedPackage, name: &str, range: &str, kind: DependencyKind, depth: usize) -> Request {
    Request {
        name: name.to_string(),
        range: range.to_string(),
        kind,
        depth: depth + 1,
        parent: Some(parent.name.clone()),
    }
}

/// Pick the version a range (or dist-tag) selects from published metadata
pub fn select_version(
    metadata: &PackageMetadata,
    name: &str,
    range: &str,
    req: Option<&VersionReq>,
) -> ResolverResult<Version> {
    let no_match = || HuskError::NoMatchingVersion {
        name: name.to_string(),
        range: range.to_string(),
    };

    match req {
        Some(req) => find_best_version(&metadata.candidate_versions(), req).ok_or_else(no_match),
        None => match metadata.dist_tag(range.trim()) {
            Some(tagged) => tagged.parse::<Version>().map_err(|_| no_match()),
            None => Err(HuskError::UnsupportedRange {
                name: name.to_string(),
                range: range.to_string(),
            }),
        },
    }
}

fn is_tag_name(range: &str) -> bool {
    let range = range.trim();
    range.starts_with(|c: char| c.is_ascii_alphabetic())
        && range
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
