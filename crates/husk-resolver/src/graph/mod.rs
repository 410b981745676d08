//! Dependency graph implementation using petgraph
//!
//! One node per package name (the resolver keeps a single version per name),
//! edges from dependent to dependency. Used to report cycles and to give the
//! linker a deterministic dependencies-first order.

use std::collections::{BTreeMap, HashMap};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use husk_core::types::{DependencyKind, ResolvedPackage, Version};

/// Node in the dependency graph representing a resolved package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageNode {
    pub name: String,
    pub version: Version,
}

/// Edge in the dependency graph representing a dependency relationship
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    /// Range as declared by the dependent
    pub range: String,
    pub kind: DependencyKind,
}

#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: DiGraph<PackageNode, DependencyEdge>,
    node_map: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph of an already settled package set, e.g. one read from a lockfile.
    ///
    /// Dependencies naming a package outside the set get no edge.
    pub fn from_packages(packages: &BTreeMap<String, ResolvedPackage>) -> Self {
        let mut graph = Self::new();
        for package in packages.values() {
            graph.add_package(&package.name, package.version.clone());
        }

        for package in packages.values() {
            let declared = [
                (&package.dependencies, DependencyKind::Normal),
                (&package.optional_dependencies, DependencyKind::Optional),
                (&package.peer_dependencies, DependencyKind::Peer),
            ];
            for (dependencies, kind) in declared {
                for (name, range) in dependencies {
                    if packages.contains_key(name) {
                        let edge = DependencyEdge {
                            range: range.clone(),
                            kind,
                        };
                        let _ = graph.add_dependency(&package.name, name, edge);
                    }
                }
            }
        }
        graph
    }

    /// Add a package node; re-adding a name returns the existing node
    pub fn add_package(&mut self, name: &str, version: Version) -> NodeIndex {
        if let Some(existing) = self.node_map.get(name) {
            return *existing;
        }

        let index = self.graph.add_node(PackageNode {
            name: name.to_string(),
            version,
        });
        self.node_map.insert(name.to_string(), index);
        index
    }

    /// Add a dependency edge between two known packages
    pub fn add_dependency(&mut self, from: &str, to: &str, edge: DependencyEdge) -> Result<(), String> {
        let from_index = *self
            .node_map
            .get(from)
            .ok_or_else(|| format!("Package not found: {}", from))?;
        let to_index = *self
            .node_map
            .get(to)
            .ok_or_else(|| format!("Package not found: {}", to))?;

        if self.graph.find_edge(from_index, to_index).is_none() {
            self.graph.add_edge(from_index, to_index, edge);
        }
        Ok(())
    }

    pub fn packages(&self) -> impl Iterator<Item = &PackageNode> {
        self.graph.node_weights()
    }

    pub fn package_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Every dependency cycle, each as sorted package names
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut cycles: Vec<Vec<String>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || self.graph.find_edge(scc[0], scc[0]).is_some()
            })
            .map(|scc| {
                let mut names: Vec<String> = scc
                    .into_iter()
                    .filter_map(|idx| self.graph.node_weight(idx))
                    .map(|node| node.name.clone())
                    .collect();
                names.sort();
                names
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Format cycle as "a -> b -> a"
    pub fn format_cycle(cycle: &[String]) -> String {
        match cycle.first() {
            None => "No cycle".to_string(),
            Some(first) => {
                let mut names = cycle.to_vec();
                names.push(first.clone());
                names.join(" -> ")
            },
        }
    }

    /// Package names with dependencies before their dependents.
    ///
    /// Members of a cycle are kept together and ordered by name.
    pub fn link_order(&self) -> Vec<String> {
        tarjan_scc(&self.graph)
            .into_iter()
            .flat_map(|scc| {
                let mut names: Vec<String> = scc
                    .into_iter()
                    .filter_map(|idx| self.graph.node_weight(idx))
                    .map(|node| node.name.clone())
                    .collect();
                names.sort();
                names
            })
            .collect()
    }
}
