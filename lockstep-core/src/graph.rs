//! Project graph keyed by stable names, using petgraph.

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;

use indexmap::{IndexMap, IndexSet};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use semver::{Version, VersionReq};

use crate::error::{Error, Result};
use crate::manifest::{DependencyCollection, Manifest};

/// One workspace entry.
///
/// Nodes without a manifest participate in the graph but are excluded from
/// all package-oriented operations.
#[derive(Debug, Clone)]
pub struct ProjectNode {
    pub name: String,
    pub root_path: PathBuf,
    pub manifest: Option<Manifest>,
}

impl ProjectNode {
    pub fn new(name: impl Into<String>, root_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root_path: root_path.into(),
            manifest: None,
        }
    }

    pub fn with_manifest(manifest: Manifest) -> Self {
        Self {
            name: manifest.name.clone(),
            root_path: manifest.location.clone(),
            manifest: Some(manifest),
        }
    }

    /// Whether this node carries a package manifest.
    #[inline]
    pub fn is_package(&self) -> bool {
        self.manifest.is_some()
    }

    #[inline]
    pub fn is_private(&self) -> bool {
        self.manifest.as_ref().is_some_and(|m| m.private)
    }
}

/// A dependency declaration between two workspace projects.
#[derive(Debug, Clone)]
pub struct DependencyEdge {
    pub source: String,
    pub target: String,
    pub collection: DependencyCollection,
    /// True when the target's workspace version satisfies the declared
    /// requirement. Only such edges constrain ordering and cycle detection;
    /// a mismatched requirement is resolved externally.
    pub satisfied_locally: bool,
}

/// Directed graph of workspace projects and their dependency edges.
///
/// Nodes are keyed by name and iterated in insertion order. Edges point
/// from the depending project to its dependency. The graph is a read-only
/// snapshot for the duration of one command invocation.
#[derive(Debug)]
pub struct ProjectGraph {
    graph: DiGraph<String, DependencyEdge>,
    node_map: IndexMap<String, NodeIndex>,
    nodes: IndexMap<String, ProjectNode>,
}

impl ProjectGraph {
    /// Builds the graph from workspace projects.
    ///
    /// Dependency declarations whose target is not a workspace package get
    /// no edge; they are resolved externally. Declarations targeting a
    /// workspace package are marked `satisfied_locally` when the target's
    /// current version matches the requirement.
    pub fn new(projects: Vec<ProjectNode>) -> Result<Self> {
        let mut graph = DiGraph::new();
        let mut node_map = IndexMap::new();
        let mut nodes: IndexMap<String, ProjectNode> = IndexMap::new();

        for project in projects {
            let index = graph.add_node(project.name.clone());
            node_map.insert(project.name.clone(), index);
            nodes.insert(project.name.clone(), project);
        }

        for (name, project) in &nodes {
            let Some(manifest) = &project.manifest else {
                continue;
            };
            for (collection, table) in manifest.dependency_tables() {
                for (target, requirement) in table {
                    let Some(target_node) = nodes.get(target) else {
                        continue;
                    };
                    let Some(target_manifest) = &target_node.manifest else {
                        continue;
                    };
                    let satisfied_locally = requirement_matches(requirement, &target_manifest.version);
                    graph.add_edge(
                        node_map[name],
                        node_map[target],
                        DependencyEdge {
                            source: name.clone(),
                            target: target.clone(),
                            collection,
                            satisfied_locally,
                        },
                    );
                }
            }
        }

        Ok(Self {
            graph,
            node_map,
            nodes,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Retrieves a project by name.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&ProjectNode> {
        self.nodes.get(name)
    }

    /// Retrieves a project by name, failing with the list of known names.
    ///
    /// # Errors
    ///
    /// Returns an error if the project is not in the graph.
    pub fn expect(&self, name: &str) -> Result<&ProjectNode> {
        self.nodes.get(name).ok_or_else(|| Error::ProjectNotFound {
            name: name.to_string(),
            available: self.available(),
        })
    }

    /// All projects in insertion order.
    pub fn projects(&self) -> impl Iterator<Item = &ProjectNode> {
        self.nodes.values()
    }

    /// Projects carrying a package manifest, in insertion order.
    pub fn packages(&self) -> impl Iterator<Item = &ProjectNode> {
        self.nodes.values().filter(|p| p.is_package())
    }

    /// All dependency edges out of `name`, in declaration order.
    ///
    /// # Errors
    ///
    /// Returns an error if the project is not in the graph.
    pub fn dependencies_of(&self, name: &str) -> Result<Vec<&DependencyEdge>> {
        let index = self.node_index(name)?;
        let mut edges: Vec<&DependencyEdge> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .map(|edge| edge.weight())
            .collect();
        // petgraph iterates edges newest-first
        edges.reverse();
        Ok(edges)
    }

    /// Edges out of `name` with `satisfied_locally = true`, in declaration
    /// order. Only these constrain ordering and cycle detection.
    ///
    /// # Errors
    ///
    /// Returns an error if the project is not in the graph.
    pub fn local_dependencies_of(&self, name: &str) -> Result<Vec<&DependencyEdge>> {
        let mut edges = self.dependencies_of(name)?;
        edges.retain(|edge| edge.satisfied_locally);
        Ok(edges)
    }

    /// Names of projects with a local edge pointing at `name`, in node
    /// insertion order of the sources.
    ///
    /// # Errors
    ///
    /// Returns an error if the project is not in the graph.
    pub fn local_dependents_of(&self, name: &str) -> Result<Vec<&str>> {
        let index = self.node_index(name)?;
        let mut sources: Vec<&str> = self
            .graph
            .edges_directed(index, Direction::Incoming)
            .filter(|edge| edge.weight().satisfied_locally)
            .map(|edge| edge.weight().source.as_str())
            .collect();
        sources.sort_by_key(|source| self.node_map.get_index_of(*source));
        sources.dedup();
        Ok(sources)
    }

    /// Breadth-first expansion along inverted local edges.
    ///
    /// Returns the transitive dependents discovered, in discovery order,
    /// excluding the seeds themselves. A dependent already in the seed set,
    /// already discovered, or equal to the node being expanded from is not
    /// re-added, which breaks cycles safely.
    ///
    /// # Errors
    ///
    /// Returns an error if a seed is not in the graph.
    pub fn expand_local_dependents(&self, seeds: &[String]) -> Result<Vec<String>> {
        self.expand(seeds, |name| {
            Ok(self
                .local_dependents_of(name)?
                .into_iter()
                .map(str::to_string)
                .collect())
        })
    }

    /// Breadth-first expansion along forward local edges.
    ///
    /// Same traversal rules as [`Self::expand_local_dependents`], in the
    /// dependency direction.
    ///
    /// # Errors
    ///
    /// Returns an error if a seed is not in the graph.
    pub fn expand_local_dependencies(&self, seeds: &[String]) -> Result<Vec<String>> {
        self.expand(seeds, |name| {
            Ok(self
                .local_dependencies_of(name)?
                .into_iter()
                .map(|edge| edge.target.clone())
                .collect())
        })
    }

    fn expand<F>(&self, seeds: &[String], neighbors: F) -> Result<Vec<String>>
    where
        F: Fn(&str) -> Result<Vec<String>>,
    {
        let seed_set: HashSet<&str> = seeds.iter().map(String::as_str).collect();
        let mut discovered: IndexSet<String> = IndexSet::new();
        let mut queue: VecDeque<String> = seeds.iter().cloned().collect();

        while let Some(current) = queue.pop_front() {
            for neighbor in neighbors(&current)? {
                if neighbor == current
                    || seed_set.contains(neighbor.as_str())
                    || discovered.contains(&neighbor)
                {
                    continue;
                }
                discovered.insert(neighbor.clone());
                queue.push_back(neighbor);
            }
        }

        Ok(discovered.into_iter().collect())
    }

    fn node_index(&self, name: &str) -> Result<NodeIndex> {
        self.node_map
            .get(name)
            .copied()
            .ok_or_else(|| Error::ProjectNotFound {
                name: name.to_string(),
                available: self.available(),
            })
    }

    fn available(&self) -> String {
        let names: Vec<&str> = self.nodes.keys().map(String::as_str).collect();
        names.join(", ")
    }
}

fn requirement_matches(requirement: &str, version: &str) -> bool {
    let Ok(requirement) = VersionReq::parse(requirement) else {
        return false;
    };
    let Ok(version) = Version::parse(version) else {
        return false;
    };
    requirement.matches(&version)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(name: &str, version: &str, deps: &[(&str, &str)]) -> ProjectNode {
        let mut manifest = Manifest::from_toml(
            &format!("name = \"{}\"\nversion = \"{}\"", name, version),
            name,
            format!("packages/{}", name),
        )
        .unwrap();
        for (dep, req) in deps {
            manifest
                .dependencies
                .insert(dep.to_string(), req.to_string());
        }
        ProjectNode::with_manifest(manifest)
    }

    #[test]
    fn local_edges_require_satisfied_requirement() {
        let graph = ProjectGraph::new(vec![
            package("pkg-a", "1.0.0", &[("pkg-b", "^1.0.0"), ("pkg-c", "^2.0.0")]),
            package("pkg-b", "1.4.2", &[]),
            package("pkg-c", "1.0.0", &[]),
        ])
        .unwrap();

        let all = graph.dependencies_of("pkg-a").unwrap();
        assert_eq!(all.len(), 2);

        let local = graph.local_dependencies_of("pkg-a").unwrap();
        assert_eq!(local.len(), 1);
        assert_eq!(local[0].target, "pkg-b");
        assert!(local[0].satisfied_locally);
    }

    #[test]
    fn external_dependencies_get_no_edge() {
        let graph = ProjectGraph::new(vec![package("pkg-a", "1.0.0", &[("serde", "^1.0")])])
            .unwrap();
        assert!(graph.dependencies_of("pkg-a").unwrap().is_empty());
    }

    #[test]
    fn dependents_are_inverted_local_edges() {
        let graph = ProjectGraph::new(vec![
            package("pkg-a", "1.0.0", &[("pkg-c", "^1.0.0")]),
            package("pkg-b", "1.0.0", &[("pkg-c", "2.0.0")]),
            package("pkg-c", "1.0.0", &[]),
        ])
        .unwrap();

        // pkg-b's requirement does not match, so only pkg-a is a local dependent
        assert_eq!(graph.local_dependents_of("pkg-c").unwrap(), vec!["pkg-a"]);
    }

    #[test]
    fn expansion_is_transitive_and_cycle_safe() {
        let graph = ProjectGraph::new(vec![
            package("pkg-base", "1.0.0", &[]),
            package("pkg-mid", "1.0.0", &[("pkg-base", "^1.0.0")]),
            package("pkg-top", "1.0.0", &[("pkg-mid", "^1.0.0")]),
        ])
        .unwrap();

        let dependents = graph
            .expand_local_dependents(&["pkg-base".to_string()])
            .unwrap();
        assert_eq!(dependents, vec!["pkg-mid", "pkg-top"]);

        let dependencies = graph
            .expand_local_dependencies(&["pkg-top".to_string()])
            .unwrap();
        assert_eq!(dependencies, vec!["pkg-mid", "pkg-base"]);
    }

    #[test]
    fn expansion_terminates_on_cycles() {
        let graph = ProjectGraph::new(vec![
            package("pkg-x", "1.0.0", &[("pkg-y", "^1.0.0")]),
            package("pkg-y", "1.0.0", &[("pkg-x", "^1.0.0")]),
        ])
        .unwrap();

        let dependents = graph
            .expand_local_dependents(&["pkg-x".to_string()])
            .unwrap();
        assert_eq!(dependents, vec!["pkg-y"]);
    }

    #[test]
    fn unknown_project_reports_known_names() {
        let graph = ProjectGraph::new(vec![package("pkg-a", "1.0.0", &[])]).unwrap();
        let err = graph.expect("pkg-zz").unwrap_err();
        assert!(err.to_string().contains("pkg-a"));
    }
}
