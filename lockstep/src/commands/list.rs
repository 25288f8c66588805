//! Lists workspace packages.

use std::path::PathBuf;

use anyhow::Result;

use lockstep_core::ProjectNode;

use crate::workspace;

use super::print_projects;

pub fn cmd_list(workspace_dir: PathBuf, json: bool) -> Result<()> {
    let graph = workspace::load_graph(&workspace_dir)?;
    let projects: Vec<ProjectNode> = graph.packages().cloned().collect();
    print_projects(&projects, json)
}
