//! Core library for workspace orchestration.
//!
//! Given a graph of packages and their local interdependencies, this crate
//! decides which packages changed since a reference point, expands a
//! requested package set along local dependency edges, and schedules a
//! per-package action in an order that respects those edges, with bounded
//! concurrency, even when the graph contains cycles.
//!
//! Graph construction, version-control commands, and the per-package
//! action itself live outside this crate and plug in through
//! [`VersionControl`], [`Reporter`], and the action callback.

pub mod changes;
pub mod cycles;
pub mod error;
pub mod filter;
pub mod graph;
pub mod manifest;
pub mod report;
pub mod topology;
pub mod vcs;

pub use changes::{BumpKind, ChangeCollector, ChangeOptions, ForcedProjects};
pub use cycles::{cycle_path, find_cycles, merge_overlapping, report_cycles, CyclePath};
pub use error::{Error, Result};
pub use filter::{FilterOptions, ProjectFilter};
pub use graph::{DependencyEdge, ProjectGraph, ProjectNode};
pub use manifest::{DependencyCollection, Manifest};
pub use report::{NullReporter, Reporter};
pub use topology::{run_topologically, topological_order, ScheduleOptions};
pub use vcs::{TagDescription, VersionControl};
