//! Command implementations for the CLI.

mod changed;
mod list;
mod run;

use anyhow::Result;
use owo_colors::OwoColorize;

use lockstep_core::ProjectNode;

pub use changed::cmd_changed;
pub use list::cmd_list;
pub use run::{cmd_run, RunArgs};

fn print_projects(projects: &[ProjectNode], json: bool) -> Result<()> {
    if json {
        let entries: Vec<serde_json::Value> = projects
            .iter()
            .filter_map(|project| {
                project.manifest.as_ref().map(|manifest| {
                    serde_json::json!({
                        "name": manifest.name,
                        "version": manifest.version,
                        "private": manifest.private,
                        "location": project.root_path,
                    })
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for project in projects {
        let Some(manifest) = &project.manifest else {
            continue;
        };
        let marker = if manifest.private { " (private)" } else { "" };
        println!(
            "{} {}{}",
            manifest.name.bold(),
            format!("v{}", manifest.version).dimmed(),
            marker.yellow()
        );
    }
    Ok(())
}
