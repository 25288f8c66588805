//! Scope filtering: narrows the package list a command operates on.

use glob::Pattern;
use indexmap::IndexSet;

use crate::changes::{ChangeCollector, ChangeOptions};
use crate::error::{Error, Result};
use crate::graph::{ProjectGraph, ProjectNode};
use crate::report::Reporter;
use crate::vcs::VersionControl;

/// Options controlling [`ProjectFilter::filter`].
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    /// Name globs to include. Empty means all.
    pub scope: Vec<String>,
    /// Name globs to exclude.
    pub ignore: Vec<String>,
    pub exclude_private: bool,
    pub include_dependents: bool,
    pub include_dependencies: bool,
    /// Return an empty set instead of failing when nothing matches.
    pub continue_if_no_match: bool,
}

pub(crate) fn compile_patterns(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|error| Error::InvalidPattern {
                pattern: pattern.clone(),
                error,
            })
        })
        .collect()
}

/// Combines name-pattern matching, changed-set filtering, and
/// dependency/dependent expansion into the final package set.
pub struct ProjectFilter<'a> {
    graph: &'a ProjectGraph,
    reporter: &'a dyn Reporter,
}

impl<'a> ProjectFilter<'a> {
    pub fn new(graph: &'a ProjectGraph, reporter: &'a dyn Reporter) -> Self {
        Self { graph, reporter }
    }

    /// Runs the filter pipeline without change detection.
    ///
    /// # Errors
    ///
    /// Fails with `NoProjectsMatched` when patterns were given, nothing
    /// matched, and `continue_if_no_match` is unset.
    pub fn filter(&self, options: &FilterOptions) -> Result<Vec<ProjectNode>> {
        self.filter_inner(options, None)
    }

    /// Runs the filter pipeline, replacing the scoped set with the changed
    /// set computed by the change collector.
    ///
    /// # Errors
    ///
    /// Same as [`Self::filter`], plus any change-collection failure.
    pub fn filter_since(
        &self,
        options: &FilterOptions,
        vcs: &dyn VersionControl,
        change: &ChangeOptions,
    ) -> Result<Vec<ProjectNode>> {
        self.filter_inner(options, Some((vcs, change)))
    }

    fn filter_inner(
        &self,
        options: &FilterOptions,
        change: Option<(&dyn VersionControl, &ChangeOptions)>,
    ) -> Result<Vec<ProjectNode>> {
        // Only nodes carrying a package manifest are user-addressable.
        let mut selected: Vec<ProjectNode> = self.graph.packages().cloned().collect();

        if options.exclude_private {
            selected.retain(|project| !project.is_private());
        }

        if !options.scope.is_empty() || !options.ignore.is_empty() {
            let scope = compile_patterns(&options.scope)?;
            let ignore = compile_patterns(&options.ignore)?;
            selected.retain(|project| {
                (scope.is_empty() || scope.iter().any(|pattern| pattern.matches(&project.name)))
                    && !ignore.iter().any(|pattern| pattern.matches(&project.name))
            });
            if selected.is_empty() {
                if options.continue_if_no_match {
                    return Ok(Vec::new());
                }
                return Err(Error::NoProjectsMatched {
                    patterns: describe_patterns(options),
                });
            }
        }

        if let Some((vcs, change)) = change {
            let collector = ChangeCollector::new(self.graph, vcs, self.reporter);
            selected = collector.collect_changed(&selected, change)?;
        }

        let mut names: IndexSet<String> = selected.iter().map(|p| p.name.clone()).collect();
        if options.include_dependents {
            let seeds: Vec<String> = names.iter().cloned().collect();
            names.extend(self.graph.expand_local_dependents(&seeds)?);
        }
        if options.include_dependencies {
            let seeds: Vec<String> = names.iter().cloned().collect();
            names.extend(self.graph.expand_local_dependencies(&seeds)?);
        }

        names
            .iter()
            .map(|name| self.graph.expect(name).cloned())
            .collect()
    }
}

fn describe_patterns(options: &FilterOptions) -> String {
    let mut parts: Vec<String> = options.scope.clone();
    parts.extend(options.ignore.iter().map(|pattern| format!("!{pattern}")));
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;
    use crate::report::NullReporter;
    use crate::vcs::TagDescription;
    use std::path::{Path, PathBuf};

    fn package(name: &str, private: bool, deps: &[&str]) -> ProjectNode {
        let mut manifest = Manifest::from_toml(
            &format!(
                "name = \"{}\"\nversion = \"1.0.0\"\nprivate = {}",
                name, private
            ),
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

    fn fixture_graph() -> ProjectGraph {
        ProjectGraph::new(vec![
            package("pkg-base", false, &[]),
            package("pkg-2", false, &["pkg-base"]),
            package("pkg-1", false, &["pkg-2"]),
            package("pkg-hidden", true, &[]),
        ])
        .unwrap()
    }

    fn names(projects: &[ProjectNode]) -> Vec<&str> {
        projects.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn no_options_selects_all_packages() {
        let graph = fixture_graph();
        let filter = ProjectFilter::new(&graph, &NullReporter);
        let selected = filter.filter(&FilterOptions::default()).unwrap();
        assert_eq!(
            names(&selected),
            vec!["pkg-base", "pkg-2", "pkg-1", "pkg-hidden"]
        );
    }

    #[test]
    fn nodes_without_manifest_are_never_addressable() {
        let mut projects = vec![package("pkg-a", false, &[])];
        projects.push(ProjectNode::new("tooling", "tooling"));
        let graph = ProjectGraph::new(projects).unwrap();
        let filter = ProjectFilter::new(&graph, &NullReporter);

        let selected = filter.filter(&FilterOptions::default()).unwrap();
        assert_eq!(names(&selected), vec!["pkg-a"]);
    }

    #[test]
    fn exclude_private_drops_private_packages() {
        let graph = fixture_graph();
        let filter = ProjectFilter::new(&graph, &NullReporter);
        let selected = filter
            .filter(&FilterOptions {
                exclude_private: true,
                ..FilterOptions::default()
            })
            .unwrap();
        assert!(!names(&selected).contains(&"pkg-hidden"));
    }

    #[test]
    fn scope_and_ignore_patterns_combine() {
        let graph = fixture_graph();
        let filter = ProjectFilter::new(&graph, &NullReporter);
        let selected = filter
            .filter(&FilterOptions {
                scope: vec!["pkg-*".to_string()],
                ignore: vec!["pkg-hidden".to_string()],
                ..FilterOptions::default()
            })
            .unwrap();
        assert_eq!(names(&selected), vec!["pkg-base", "pkg-2", "pkg-1"]);
    }

    #[test]
    fn no_match_fails_unless_bypassed() {
        let graph = fixture_graph();
        let filter = ProjectFilter::new(&graph, &NullReporter);

        let err = filter
            .filter(&FilterOptions {
                scope: vec!["nope-*".to_string()],
                ..FilterOptions::default()
            })
            .unwrap_err();
        match err {
            Error::NoProjectsMatched { patterns } => assert_eq!(patterns, "nope-*"),
            other => panic!("expected NoProjectsMatched, got {other}"),
        }

        let selected = filter
            .filter(&FilterOptions {
                scope: vec!["nope-*".to_string()],
                continue_if_no_match: true,
                ..FilterOptions::default()
            })
            .unwrap();
        assert!(selected.is_empty());
    }

    #[test]
    fn include_dependencies_appends_in_discovery_order() {
        let graph = fixture_graph();
        let filter = ProjectFilter::new(&graph, &NullReporter);
        let selected = filter
            .filter(&FilterOptions {
                scope: vec!["pkg-1".to_string()],
                include_dependencies: true,
                ..FilterOptions::default()
            })
            .unwrap();
        assert_eq!(names(&selected), vec!["pkg-1", "pkg-2", "pkg-base"]);
    }

    #[test]
    fn include_dependents_appends_without_duplicates() {
        let graph = fixture_graph();
        let filter = ProjectFilter::new(&graph, &NullReporter);
        let selected = filter
            .filter(&FilterOptions {
                scope: vec!["pkg-base".to_string(), "pkg-1".to_string()],
                include_dependents: true,
                ..FilterOptions::default()
            })
            .unwrap();
        // pkg-1 stays where the scope put it; only pkg-2 is appended
        assert_eq!(names(&selected), vec!["pkg-base", "pkg-1", "pkg-2"]);
    }

    #[test]
    fn expansions_never_remove_and_never_duplicate() {
        let graph = fixture_graph();
        let filter = ProjectFilter::new(&graph, &NullReporter);
        let selected = filter
            .filter(&FilterOptions {
                scope: vec!["pkg-2".to_string()],
                include_dependents: true,
                include_dependencies: true,
                ..FilterOptions::default()
            })
            .unwrap();

        let mut sorted = names(&selected);
        sorted.sort_unstable();
        assert_eq!(sorted, vec!["pkg-1", "pkg-2", "pkg-base"]);
        assert_eq!(selected.len(), 3);
    }

    #[test]
    fn filtering_is_idempotent() {
        let graph = fixture_graph();
        let filter = ProjectFilter::new(&graph, &NullReporter);
        let options = FilterOptions {
            scope: vec!["pkg-*".to_string()],
            include_dependencies: true,
            ..FilterOptions::default()
        };

        let first = filter.filter(&options).unwrap();
        let second = filter.filter(&options).unwrap();
        assert_eq!(names(&first), names(&second));
    }

    #[test]
    fn since_delegates_to_change_collector() {
        struct StaticVcs;
        impl VersionControl for StaticVcs {
            fn describe(&self) -> crate::error::Result<Option<TagDescription>> {
                Ok(Some(TagDescription {
                    tag: "v1.0.0".to_string(),
                    ref_count: 2,
                    sha: "abc1234".to_string(),
                }))
            }
            fn diff_since(
                &self,
                _committish: &str,
                location: &Path,
            ) -> crate::error::Result<Vec<PathBuf>> {
                if location.ends_with("pkg-2") {
                    Ok(vec![PathBuf::from("packages/pkg-2/src/lib.rs")])
                } else {
                    Ok(Vec::new())
                }
            }
        }

        let graph = fixture_graph();
        let filter = ProjectFilter::new(&graph, &NullReporter);
        let selected = filter
            .filter_since(
                &FilterOptions::default(),
                &StaticVcs,
                &ChangeOptions::default(),
            )
            .unwrap();
        assert_eq!(names(&selected), vec!["pkg-2", "pkg-1"]);
    }
}
