//! Lists packages changed since a reference point.

use std::path::PathBuf;

use anyhow::Result;

use lockstep_core::{BumpKind, ChangeCollector, ChangeOptions, ForcedProjects, ProjectNode};

use crate::git::GitCli;
use crate::reporter::ConsoleReporter;
use crate::workspace;

use super::print_projects;

#[allow(clippy::too_many_arguments)]
pub fn cmd_changed(
    workspace_dir: PathBuf,
    since: Option<String>,
    canary: bool,
    force: Vec<String>,
    ignore_changes: Vec<String>,
    exclude_dependents: bool,
    bump: Option<BumpKind>,
    json: bool,
) -> Result<()> {
    let graph = workspace::load_graph(&workspace_dir)?;
    let vcs = GitCli::new(&workspace_dir);
    let reporter = ConsoleReporter;
    let collector = ChangeCollector::new(&graph, &vcs, &reporter);

    let projects: Vec<ProjectNode> = graph.packages().cloned().collect();
    let options = ChangeOptions {
        since,
        canary,
        forced: ForcedProjects::from_values(&force),
        ignore_changes,
        bump,
        exclude_dependents,
    };

    let changed = collector.collect_changed(&projects, &options)?;
    print_projects(&changed, json)
}
