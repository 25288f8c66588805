//! Runs a manifest script across packages in dependency order.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use lockstep_core::{
    run_topologically, topological_order, ChangeOptions, Error, FilterOptions, ForcedProjects,
    ProjectFilter, ProjectNode, ScheduleOptions,
};

use crate::git::GitCli;
use crate::reporter::ConsoleReporter;
use crate::workspace;

#[derive(Args)]
pub struct RunArgs {
    /// Manifest script to run in each package
    pub script: String,

    /// Package name globs to include
    #[arg(long, value_name = "GLOB")]
    pub scope: Vec<String>,

    /// Package name globs to exclude
    #[arg(long, value_name = "GLOB")]
    pub ignore: Vec<String>,

    /// Only packages changed since this reference point
    #[arg(long)]
    pub since: Option<String>,

    /// Treat these packages as changed (`*` for all, with --since)
    #[arg(long = "force", value_name = "NAMES")]
    pub force: Vec<String>,

    /// File globs that never count as changes (with --since)
    #[arg(long = "ignore-changes", value_name = "GLOB")]
    pub ignore_changes: Vec<String>,

    /// Also run transitive dependents of the selected packages
    #[arg(long, action)]
    pub include_dependents: bool,

    /// Also run transitive dependencies of the selected packages
    #[arg(long, action)]
    pub include_dependencies: bool,

    /// Skip private packages
    #[arg(long, action)]
    pub no_private: bool,

    #[arg(short = 'j', long, default_value_t = 4)]
    pub concurrency: usize,

    /// Fail instead of warning when dependency cycles exist
    #[arg(long, action)]
    pub reject_cycles: bool,

    /// Ignore dependency order and run everything as one batch
    #[arg(long, action)]
    pub no_sort: bool,

    /// Print the execution order without running anything
    #[arg(long, action)]
    pub dry_run: bool,
}

pub fn cmd_run(workspace_dir: PathBuf, args: RunArgs) -> Result<()> {
    let graph = workspace::load_graph(&workspace_dir)?;
    let reporter = ConsoleReporter;
    let filter = ProjectFilter::new(&graph, &reporter);

    let filter_options = FilterOptions {
        scope: args.scope.clone(),
        ignore: args.ignore.clone(),
        exclude_private: args.no_private,
        include_dependents: args.include_dependents,
        include_dependencies: args.include_dependencies,
        continue_if_no_match: false,
    };

    let mut selected = if args.since.is_some() {
        let vcs = GitCli::new(&workspace_dir);
        let change_options = ChangeOptions {
            since: args.since.clone(),
            canary: false,
            forced: ForcedProjects::from_values(&args.force),
            ignore_changes: args.ignore_changes.clone(),
            bump: None,
            exclude_dependents: false,
        };
        filter.filter_since(&filter_options, &vcs, &change_options)?
    } else {
        filter.filter(&filter_options)?
    };

    selected.retain(|project| {
        project
            .manifest
            .as_ref()
            .is_some_and(|manifest| manifest.script(&args.script).is_some())
    });
    if selected.is_empty() {
        println!("No packages define script '{}'", args.script);
        return Ok(());
    }

    let schedule = ScheduleOptions {
        concurrency: args.concurrency,
        reject_on_cycle: args.reject_cycles,
    };

    if args.dry_run {
        let order = topological_order(&selected, &graph, &schedule, &reporter)?;
        for project in &order {
            println!("{}", project.name);
        }
        return Ok(());
    }

    let runtime = tokio::runtime::Runtime::new()?;
    let script = args.script.clone();
    let completed = if args.no_sort {
        runtime.block_on(run_unordered(&selected, &script, schedule.concurrency))?
    } else {
        runtime.block_on(run_topologically(
            &selected,
            &graph,
            |project| run_script(project, script.clone()),
            &schedule,
            &reporter,
        ))?
    };

    println!(
        "{} ran '{}' in {} package{}",
        "done:".green().bold(),
        args.script,
        completed.len(),
        if completed.len() == 1 { "" } else { "s" }
    );
    Ok(())
}

/// Spawns the script through `sh -c` in the package directory and relays
/// its output with a package-name prefix once it finishes.
async fn run_script(project: ProjectNode, script: String) -> lockstep_core::Result<String> {
    let command = project
        .manifest
        .as_ref()
        .and_then(|manifest| manifest.script(&script))
        .ok_or_else(|| Error::Action {
            project: project.name.clone(),
            message: format!("script '{script}' not found"),
        })?
        .to_string();

    let output = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(&command)
        .current_dir(&project.root_path)
        .output()
        .await
        .map_err(|e| Error::Action {
            project: project.name.clone(),
            message: format!("failed to spawn '{command}': {e}"),
        })?;

    let prefix = format!("[{}]", project.name);
    for line in String::from_utf8_lossy(&output.stdout).lines() {
        println!("{} {}", prefix.bright_black().bold(), line);
    }
    for line in String::from_utf8_lossy(&output.stderr).lines() {
        eprintln!("{} {}", prefix.bright_black().bold(), line.bright_red());
    }

    if !output.status.success() {
        return Err(Error::Action {
            project: project.name.clone(),
            message: format!("script '{script}' exited with {}", output.status),
        });
    }
    Ok(project.name)
}

/// One unordered batch, still bounded by the concurrency limit.
async fn run_unordered(
    projects: &[ProjectNode],
    script: &str,
    concurrency: usize,
) -> lockstep_core::Result<Vec<String>> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for project in projects {
        let project = project.clone();
        let script = script.to_string();
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("semaphore unexpectedly closed");
            run_script(project, script).await
        });
    }

    let mut completed = Vec::with_capacity(projects.len());
    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        match joined.map_err(|error| Error::Internal(error.to_string()))? {
            Ok(name) => completed.push(name),
            Err(error) => {
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }
    }

    match first_error {
        Some(error) => Err(error),
        None => Ok(completed),
    }
}
