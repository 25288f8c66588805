//! Workspace discovery: builds the project graph from on-disk manifests.

use std::fs;
use std::path::Path;

use anyhow::Result;
use walkdir::{DirEntry, WalkDir};

use lockstep_core::{Manifest, ProjectGraph, ProjectNode};

pub const MANIFEST_FILE: &str = "lockstep.toml";

fn is_scannable(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return true;
    }
    let name = entry.file_name().to_string_lossy();
    !name.starts_with('.') && name != "target" && name != "node_modules"
}

/// Walks `workspace_dir` for `lockstep.toml` manifests and builds the
/// project graph. Projects are sorted by name so the graph snapshot is
/// independent of directory iteration order.
pub fn load_graph(workspace_dir: &Path) -> Result<ProjectGraph> {
    let mut projects = Vec::new();

    for entry in WalkDir::new(workspace_dir)
        .into_iter()
        .filter_entry(is_scannable)
    {
        let entry = entry?;
        if !entry.file_type().is_file() || entry.file_name().to_str() != Some(MANIFEST_FILE) {
            continue;
        }

        let content = fs::read_to_string(entry.path())?;
        let location = entry
            .path()
            .parent()
            .unwrap_or(workspace_dir)
            .to_path_buf();
        let manifest = Manifest::from_toml(
            &content,
            &entry.path().display().to_string(),
            &location,
        )?;
        projects.push(ProjectNode::with_manifest(manifest));
    }

    projects.sort_by(|a, b| a.name.cmp(&b.name));
    tracing::debug!(projects = projects.len(), "scanned workspace");

    Ok(ProjectGraph::new(projects)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_package(root: &Path, name: &str, extra: &str) {
        let dir = root.join("packages").join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(MANIFEST_FILE),
            format!("name = \"{}\"\nversion = \"1.0.0\"\n{}", name, extra),
        )
        .unwrap();
    }

    #[test]
    fn scans_manifests_and_builds_edges() {
        let temp = TempDir::new().unwrap();
        write_package(temp.path(), "pkg-base", "");
        write_package(
            temp.path(),
            "pkg-app",
            "[dependencies]\npkg-base = \"^1.0.0\"\n",
        );

        let graph = load_graph(temp.path()).unwrap();
        assert_eq!(graph.len(), 2);

        let local = graph.local_dependencies_of("pkg-app").unwrap();
        assert_eq!(local.len(), 1);
        assert_eq!(local[0].target, "pkg-base");
    }

    #[test]
    fn skips_hidden_and_build_directories() {
        let temp = TempDir::new().unwrap();
        write_package(temp.path(), "pkg-a", "");

        let hidden = temp.path().join(".cache").join("pkg-ghost");
        fs::create_dir_all(&hidden).unwrap();
        fs::write(
            hidden.join(MANIFEST_FILE),
            "name = \"pkg-ghost\"\nversion = \"1.0.0\"",
        )
        .unwrap();

        let graph = load_graph(temp.path()).unwrap();
        assert_eq!(graph.len(), 1);
        assert!(graph.get("pkg-ghost").is_none());
    }
}
