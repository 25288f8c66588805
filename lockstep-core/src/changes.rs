//! Change-set collection relative to a version-control reference point.

use std::collections::HashSet;

use glob::Pattern;
use indexmap::IndexSet;

use crate::error::Result;
use crate::filter::compile_patterns;
use crate::graph::{ProjectGraph, ProjectNode};
use crate::report::Reporter;
use crate::vcs::VersionControl;

/// Normalized force-include set with an explicit wildcard sentinel.
///
/// The raw flag may be a bare switch, a comma-separated string, or a
/// repeated list; everything is flattened into a name set before the core
/// sees it.
#[derive(Debug, Clone, Default)]
pub struct ForcedProjects {
    names: HashSet<String>,
    wildcard: bool,
}

impl ForcedProjects {
    pub fn none() -> Self {
        Self::default()
    }

    /// The wildcard set: every project is forced.
    pub fn all() -> Self {
        Self {
            names: HashSet::new(),
            wildcard: true,
        }
    }

    /// Normalizes raw flag values. Entries may be comma-separated; a `*`
    /// anywhere means all.
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut forced = Self::default();
        for value in values {
            for name in value.as_ref().split(',') {
                let name = name.trim();
                if name.is_empty() {
                    continue;
                }
                if name == "*" {
                    forced.wildcard = true;
                } else {
                    forced.names.insert(name.to_string());
                }
            }
        }
        forced
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.wildcard && self.names.is_empty()
    }

    #[inline]
    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.wildcard || self.names.contains(name)
    }
}

/// Requested version bump kind.
///
/// Non-prerelease kinds graduate projects currently sitting on a
/// prerelease version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpKind {
    Major,
    Minor,
    Patch,
    Premajor,
    Preminor,
    Prepatch,
    Prerelease,
}

impl BumpKind {
    #[inline]
    pub fn is_prerelease(&self) -> bool {
        matches!(
            self,
            BumpKind::Premajor | BumpKind::Preminor | BumpKind::Prepatch | BumpKind::Prerelease
        )
    }
}

/// Options for [`ChangeCollector::collect_changed`].
#[derive(Debug, Clone, Default)]
pub struct ChangeOptions {
    /// Explicit reference point; wins over tag resolution.
    pub since: Option<String>,
    /// Measure against the tip's first parent instead of the newest tag.
    pub canary: bool,
    pub forced: ForcedProjects,
    /// Glob patterns for files that never mark a project as changed.
    pub ignore_changes: Vec<String>,
    pub bump: Option<BumpKind>,
    /// Skip the dependent-expansion step.
    pub exclude_dependents: bool,
}

/// Decides which projects changed relative to a reference point and
/// expands the set to transitive dependents.
pub struct ChangeCollector<'a> {
    graph: &'a ProjectGraph,
    vcs: &'a dyn VersionControl,
    reporter: &'a dyn Reporter,
}

impl<'a> ChangeCollector<'a> {
    pub fn new(
        graph: &'a ProjectGraph,
        vcs: &'a dyn VersionControl,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            graph,
            vcs,
            reporter,
        }
    }

    /// Collects the changed projects among `projects`.
    ///
    /// The reference point is the explicit `since` if given, else the most
    /// recent tag (or the `sha^..sha` range in canary mode). Without any
    /// reference point every project is a candidate. Unless excluded, the
    /// candidate set is expanded to transitive local dependents.
    ///
    /// The result lists candidates from `projects` in their input order,
    /// followed by dependents discovered outside that set.
    ///
    /// # Errors
    ///
    /// Returns an error if a version-control query fails or an ignore
    /// pattern does not compile.
    pub fn collect_changed(
        &self,
        projects: &[ProjectNode],
        options: &ChangeOptions,
    ) -> Result<Vec<ProjectNode>> {
        let description = self.vcs.describe()?;

        // No commits past the newest tag and nothing forced: nothing to do.
        if options.since.is_none() && options.forced.is_empty() {
            if let Some(description) = &description {
                if description.ref_count == 0 {
                    return Ok(Vec::new());
                }
            }
        }

        let committish = match &options.since {
            Some(since) => Some(since.clone()),
            None => description.as_ref().map(|d| {
                if options.canary {
                    format!("{}^..{}", d.sha, d.sha)
                } else {
                    d.tag.clone()
                }
            }),
        };

        let ignore = compile_patterns(&options.ignore_changes)?;
        let mut candidates: IndexSet<String> = IndexSet::new();

        if committish.is_none() || options.forced.is_wildcard() {
            let reason = if committish.is_none() {
                "no reference point found"
            } else {
                "forced wildcard"
            };
            self.reporter.on_assume_all_changed(reason);
            candidates.extend(projects.iter().map(|p| p.name.clone()));
        } else {
            let committish = committish.as_deref().unwrap_or_default();
            for project in projects {
                if options.forced.contains(&project.name) {
                    self.reporter.on_candidate(&project.name, "forced");
                    candidates.insert(project.name.clone());
                } else if needs_graduation(project, options.bump) {
                    self.reporter
                        .on_candidate(&project.name, "prerelease graduation");
                    candidates.insert(project.name.clone());
                } else if self.has_diff(project, committish, &ignore)? {
                    self.reporter
                        .on_candidate(&project.name, &format!("changed since {committish}"));
                    candidates.insert(project.name.clone());
                }
            }
        }

        if !options.exclude_dependents {
            let seeds: Vec<String> = candidates.iter().cloned().collect();
            candidates.extend(self.graph.expand_local_dependents(&seeds)?);
        }

        // Input order first, then dependents discovered outside the input.
        let mut result: Vec<ProjectNode> = projects
            .iter()
            .filter(|p| candidates.contains(&p.name))
            .cloned()
            .collect();
        let in_input: HashSet<&str> = projects.iter().map(|p| p.name.as_str()).collect();
        for name in &candidates {
            if !in_input.contains(name.as_str()) {
                result.push(self.graph.expect(name)?.clone());
            }
        }

        Ok(result)
    }

    fn has_diff(&self, project: &ProjectNode, committish: &str, ignore: &[Pattern]) -> Result<bool> {
        let files = self.vcs.diff_since(committish, &project.root_path)?;
        Ok(files
            .iter()
            .any(|file| !ignore.iter().any(|pattern| pattern.matches_path(file))))
    }
}

fn needs_graduation(project: &ProjectNode, bump: Option<BumpKind>) -> bool {
    let Some(bump) = bump else {
        return false;
    };
    if bump.is_prerelease() {
        return false;
    }
    project.manifest.as_ref().is_some_and(|m| m.is_prerelease())
}
