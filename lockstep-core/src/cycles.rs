//! Cycle discovery and merging over local dependency edges.

use std::collections::{BTreeSet, HashSet};

use indexmap::IndexSet;

use crate::error::{Error, Result};
use crate::graph::ProjectGraph;
use crate::report::Reporter;

/// An elementary cycle: an ordered list of distinct project names forming a
/// path through local edges that returns to its start.
pub type CyclePath = Vec<String>;

/// Finds elementary cycles in the local-dependency sub-graph.
///
/// Edges with `satisfied_locally = false` are never part of a cycle.
/// Discovery order is deterministic: nodes are visited in graph insertion
/// order and edges in declaration order; each cycle is reported once
/// regardless of which member it was entered through.
///
/// # Errors
///
/// Returns an error only if the graph is internally inconsistent (an edge
/// naming an unknown project).
pub fn find_cycles(graph: &ProjectGraph) -> Result<Vec<CyclePath>> {
    let mut cycles: Vec<CyclePath> = Vec::new();
    let mut seen: HashSet<BTreeSet<String>> = HashSet::new();
    let mut path: Vec<String> = Vec::new();

    for project in graph.projects() {
        visit(graph, &project.name, &mut path, &mut cycles, &mut seen)?;
    }

    Ok(cycles)
}

fn visit(
    graph: &ProjectGraph,
    current: &str,
    path: &mut Vec<String>,
    cycles: &mut Vec<CyclePath>,
    seen: &mut HashSet<BTreeSet<String>>,
) -> Result<()> {
    if let Some(position) = path.iter().position(|name| name == current) {
        let cycle: CyclePath = path[position..].to_vec();
        let key: BTreeSet<String> = cycle.iter().cloned().collect();
        if seen.insert(key) {
            cycles.push(cycle);
        }
        return Ok(());
    }

    path.push(current.to_string());
    for edge in graph.local_dependencies_of(current)? {
        visit(graph, &edge.target, path, cycles, seen)?;
    }
    path.pop();

    Ok(())
}

/// Merges cycles sharing at least one node until no pair overlaps.
///
/// Two overlapping cycles are replaced by the union of their nodes, since
/// any ordering fixing one breaks the other. Result order follows the
/// discovery order of each merged group's first member cycle.
pub fn merge_overlapping(cycles: &[CyclePath]) -> Vec<IndexSet<String>> {
    let mut merged: Vec<IndexSet<String>> = Vec::new();

    for cycle in cycles {
        let names: IndexSet<String> = cycle.iter().cloned().collect();
        let mut target: Option<usize> = None;
        let mut index = 0;

        while index < merged.len() {
            let overlaps = match target {
                Some(t) => {
                    let absorbed_into = &merged[t];
                    merged[index].iter().any(|name| absorbed_into.contains(name))
                }
                None => merged[index].iter().any(|name| names.contains(name)),
            };

            if !overlaps {
                index += 1;
                continue;
            }

            match target {
                Some(t) => {
                    // target always precedes index, so removal is safe
                    let absorbed = merged.remove(index);
                    merged[t].extend(absorbed);
                }
                None => {
                    merged[index].extend(names.iter().cloned());
                    target = Some(index);
                    index += 1;
                }
            }
        }

        if target.is_none() {
            merged.push(names);
        }
    }

    merged
}

/// Formats each cycle as a path string and either rejects or warns.
///
/// # Errors
///
/// Fails with `CycleDetected` carrying all paths when `reject_on_cycle` is
/// set and at least one cycle exists.
pub fn report_cycles(
    cycles: &[CyclePath],
    reject_on_cycle: bool,
    reporter: &dyn Reporter,
) -> Result<()> {
    if cycles.is_empty() {
        return Ok(());
    }

    let paths: Vec<String> = cycles.iter().map(|cycle| cycle_path(cycle)).collect();
    if reject_on_cycle {
        return Err(Error::CycleDetected { paths });
    }

    reporter.on_cycles(&paths);
    Ok(())
}

/// Human-readable cycle path: the node list with the first node repeated at
/// the end, e.g. `pkg-a -> pkg-b -> pkg-a`.
pub fn cycle_path(cycle: &[String]) -> String {
    let mut names: Vec<&str> = cycle.iter().map(String::as_str).collect();
    if let Some(first) = names.first().copied() {
        names.push(first);
    }
    names.join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ProjectNode;
    use crate::manifest::Manifest;
    use crate::report::NullReporter;

    fn package(name: &str, deps: &[&str]) -> ProjectNode {
        let mut manifest = Manifest::from_toml(
            &format!("name = \"{}\"\nversion = \"1.0.0\"", name),
            name,
            format!("packages/{}", name),
        )
        .unwrap();
        for dep in deps {
            manifest
                .dependencies
                .insert(dep.to_string(), "^1.0.0".to_string());
        }
        ProjectNode::with_manifest(manifest)
    }

    #[test]
    fn acyclic_graph_has_no_cycles() {
        let graph = ProjectGraph::new(vec![
            package("pkg-a", &["pkg-b"]),
            package("pkg-b", &["pkg-c"]),
            package("pkg-c", &[]),
        ])
        .unwrap();
        assert!(find_cycles(&graph).unwrap().is_empty());
    }

    #[test]
    fn finds_two_cycle_once() {
        let graph = ProjectGraph::new(vec![
            package("pkg-x", &["pkg-y"]),
            package("pkg-y", &["pkg-x"]),
        ])
        .unwrap();

        let cycles = find_cycles(&graph).unwrap();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0], vec!["pkg-x", "pkg-y"]);
    }

    #[test]
    fn unsatisfied_edges_never_form_cycles() {
        let mut x = package("pkg-x", &[]);
        x.manifest
            .as_mut()
            .unwrap()
            .dependencies
            .insert("pkg-y".to_string(), "^2.0.0".to_string());
        let graph = ProjectGraph::new(vec![x, package("pkg-y", &["pkg-x"])]).unwrap();
        assert!(find_cycles(&graph).unwrap().is_empty());
    }

    #[test]
    fn overlapping_cycles_merge_into_one_unit() {
        // a -> b -> a and b -> c -> b share b
        let graph = ProjectGraph::new(vec![
            package("pkg-a", &["pkg-b"]),
            package("pkg-b", &["pkg-a", "pkg-c"]),
            package("pkg-c", &["pkg-b"]),
        ])
        .unwrap();

        let cycles = find_cycles(&graph).unwrap();
        assert_eq!(cycles.len(), 2);

        let merged = merge_overlapping(&cycles);
        assert_eq!(merged.len(), 1);
        let names: Vec<&str> = merged[0].iter().map(String::as_str).collect();
        assert_eq!(names.len(), 3);
        assert!(names.contains(&"pkg-a"));
        assert!(names.contains(&"pkg-b"));
        assert!(names.contains(&"pkg-c"));
    }

    #[test]
    fn disjoint_cycles_stay_separate() {
        let graph = ProjectGraph::new(vec![
            package("pkg-a", &["pkg-b"]),
            package("pkg-b", &["pkg-a"]),
            package("pkg-c", &["pkg-d"]),
            package("pkg-d", &["pkg-c"]),
        ])
        .unwrap();

        let merged = merge_overlapping(&find_cycles(&graph).unwrap());
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn bridging_cycle_collapses_groups() {
        let first = vec!["a".to_string(), "b".to_string()];
        let second = vec!["c".to_string(), "d".to_string()];
        let bridge = vec!["b".to_string(), "c".to_string()];

        let merged = merge_overlapping(&[first, second, bridge]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].len(), 4);
    }

    #[test]
    fn reporting_rejects_or_warns() {
        let cycles = vec![vec!["pkg-x".to_string(), "pkg-y".to_string()]];

        let err = report_cycles(&cycles, true, &NullReporter).unwrap_err();
        match err {
            Error::CycleDetected { paths } => {
                assert_eq!(paths, vec!["pkg-x -> pkg-y -> pkg-x"]);
            }
            other => panic!("expected CycleDetected, got {other}"),
        }

        report_cycles(&cycles, false, &NullReporter).unwrap();
    }
}
