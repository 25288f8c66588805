mod commands;
mod git;
mod reporter;
mod workspace;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use lockstep_core::BumpKind;
use owo_colors::OwoColorize;
use tracing::Level;

#[derive(Parser)]
#[command(name = "lockstep")]
#[command(about = "Workspace orchestration that respects the dependency graph")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, default_value = ".")]
    workspace_dir: PathBuf,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(short, long, action)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List workspace packages
    List {
        #[arg(long, action)]
        json: bool,
    },
    /// List packages changed since a reference point
    Changed {
        /// Explicit reference point; defaults to the most recent tag
        #[arg(long)]
        since: Option<String>,
        /// Measure against the tip's first parent instead of a tag
        #[arg(long, action)]
        canary: bool,
        /// Treat these packages as changed (`*` for all)
        #[arg(long = "force", value_name = "NAMES")]
        force: Vec<String>,
        /// File globs that never count as changes
        #[arg(long = "ignore-changes", value_name = "GLOB")]
        ignore_changes: Vec<String>,
        /// Do not expand the set to transitive dependents
        #[arg(long, action)]
        exclude_dependents: bool,
        /// Planned bump kind; non-prerelease kinds graduate prereleases
        #[arg(long, value_enum)]
        bump: Option<BumpArg>,
        #[arg(long, action)]
        json: bool,
    },
    /// Run a manifest script across packages in dependency order
    Run(commands::RunArgs),
}

#[derive(clap::ValueEnum, Clone, Copy)]
enum BumpArg {
    Major,
    Minor,
    Patch,
    Premajor,
    Preminor,
    Prepatch,
    Prerelease,
}

impl From<BumpArg> for BumpKind {
    fn from(arg: BumpArg) -> Self {
        match arg {
            BumpArg::Major => BumpKind::Major,
            BumpArg::Minor => BumpKind::Minor,
            BumpArg::Patch => BumpKind::Patch,
            BumpArg::Premajor => BumpKind::Premajor,
            BumpArg::Preminor => BumpKind::Preminor,
            BumpArg::Prepatch => BumpKind::Prepatch,
            BumpArg::Prerelease => BumpKind::Prerelease,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    tracing_subscriber::fmt().with_max_level(log_level).init();

    let outcome = match cli.command {
        Commands::List { json } => commands::cmd_list(cli.workspace_dir, json),
        Commands::Changed {
            since,
            canary,
            force,
            ignore_changes,
            exclude_dependents,
            bump,
            json,
        } => commands::cmd_changed(
            cli.workspace_dir,
            since,
            canary,
            force,
            ignore_changes,
            exclude_dependents,
            bump.map(BumpKind::from),
            json,
        ),
        Commands::Run(args) => commands::cmd_run(cli.workspace_dir, args),
    };

    if let Err(error) = outcome {
        if let Some(core) = error.downcast_ref::<lockstep_core::Error>() {
            let label = if core.is_internal() { "internal" } else { "error" };
            eprintln!(
                "{} {} {}",
                format!("{label}:").red().bold(),
                format!("[{}]", core.code()).dimmed(),
                core
            );
            std::process::exit(1);
        }
        return Err(error);
    }

    Ok(())
}
