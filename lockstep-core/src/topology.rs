//! Topological scheduling over local dependency edges.
//!
//! Two variants share one batch-selection core: the concurrent scheduler
//! drives a caller-supplied async action through a bounded-concurrency
//! queue, and the synchronous variant only computes the visiting order.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::cycles::{find_cycles, merge_overlapping, report_cycles};
use crate::error::{Error, Result};
use crate::graph::{ProjectGraph, ProjectNode};
use crate::report::Reporter;

/// Options for the topological schedulers.
#[derive(Debug, Clone)]
pub struct ScheduleOptions {
    /// Maximum number of actions in flight at once.
    pub concurrency: usize,
    /// Fail with `CycleDetected` instead of warning when cycles exist.
    pub reject_on_cycle: bool,
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            reject_on_cycle: false,
        }
    }
}

/// Batch selection shared by both scheduler variants.
///
/// Tracks, per not-yet-scheduled project, the same-request local
/// dependencies that have not completed. Dependencies on projects outside
/// the requested set are invisible to ordering. Merged cycles come from the
/// entire graph; cycles outside the requested set are simply never
/// released.
struct Batcher {
    remaining: IndexMap<String, HashSet<String>>,
    cycles: Vec<IndexSet<String>>,
}

impl Batcher {
    fn new(
        projects: &[ProjectNode],
        graph: &ProjectGraph,
        cycles: Vec<IndexSet<String>>,
    ) -> Result<Self> {
        let requested: HashSet<&str> = projects.iter().map(|p| p.name.as_str()).collect();
        let mut remaining = IndexMap::new();

        for project in projects {
            let deps: HashSet<String> = graph
                .local_dependencies_of(&project.name)?
                .iter()
                .filter(|edge| {
                    edge.target != project.name && requested.contains(edge.target.as_str())
                })
                .map(|edge| edge.target.clone())
                .collect();
            remaining.insert(project.name.clone(), deps);
        }

        Ok(Self { remaining, cycles })
    }

    fn is_done(&self) -> bool {
        self.remaining.is_empty()
    }

    fn pending(&self) -> Vec<&str> {
        self.remaining.keys().map(String::as_str).collect()
    }

    /// Ready leaves, else the first releasable merged cycle, else empty.
    ///
    /// A cycle is releasable when every unscheduled member depends on
    /// nothing outside the cycle itself; the batch is the cycle's
    /// intersection with the unscheduled requested set. When several
    /// cycles qualify the first in discovery order wins.
    fn next_batch(&mut self) -> Vec<String> {
        let ready: Vec<String> = self
            .remaining
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        if !ready.is_empty() {
            for name in &ready {
                self.remaining.shift_remove(name);
            }
            return ready;
        }

        for cycle in &self.cycles {
            let members: Vec<String> = self
                .remaining
                .keys()
                .filter(|name| cycle.contains(*name))
                .cloned()
                .collect();
            if members.is_empty() {
                continue;
            }
            let releasable = members
                .iter()
                .all(|member| self.remaining[member].iter().all(|dep| cycle.contains(dep)));
            if releasable {
                for name in &members {
                    self.remaining.shift_remove(name);
                }
                return members;
            }
        }

        Vec::new()
    }

    /// Records completion: `name` no longer blocks anything.
    fn mark_done(&mut self, name: &str) {
        for deps in self.remaining.values_mut() {
            deps.remove(name);
        }
    }
}

/// Computes the order the concurrent scheduler would visit `projects` in,
/// without executing anything.
///
/// Batches are enumerated in the same way as [`run_topologically`] releases
/// them, so every project appears after all of its same-request local
/// dependencies (cycle members excepted).
///
/// # Errors
///
/// Fails with `CycleDetected` when cycles exist and are rejected, and with
/// `DanglingDependencies` when some project can never become ready — an
/// internal invariant violation.
pub fn topological_order(
    projects: &[ProjectNode],
    graph: &ProjectGraph,
    options: &ScheduleOptions,
    reporter: &dyn Reporter,
) -> Result<Vec<ProjectNode>> {
    let cycles = find_cycles(graph)?;
    report_cycles(&cycles, options.reject_on_cycle, reporter)?;
    let mut batcher = Batcher::new(projects, graph, merge_overlapping(&cycles))?;

    let mut order = Vec::with_capacity(projects.len());
    while !batcher.is_done() {
        let batch = batcher.next_batch();
        if batch.is_empty() {
            return Err(Error::DanglingDependencies {
                remaining: batcher.pending().join(", "),
            });
        }
        for name in &batch {
            order.push(graph.expect(name)?.clone());
        }
        for name in &batch {
            batcher.mark_done(name);
        }
    }

    Ok(order)
}

/// Runs `action` for every requested project, submitting each only after
/// all of its same-request local dependencies completed successfully.
///
/// Cycle members are submitted together once the cycle as a whole has no
/// outstanding external dependency. Execution is bounded by
/// `options.concurrency`; independent batches are released as completions
/// come in, never barriered on the slowest task.
///
/// Failures are captured so in-flight work drains cleanly; the first
/// captured failure is returned once the queue is idle. Dependents of a
/// failed project are never submitted. Successful results are collected in
/// completion order.
///
/// # Errors
///
/// Fails with `CycleDetected` when cycles are rejected, with the first
/// captured action failure, or with `ScheduleIncomplete` when the queue
/// went idle before every requested project was scheduled — an internal
/// invariant violation.
pub async fn run_topologically<T, F, Fut>(
    projects: &[ProjectNode],
    graph: &ProjectGraph,
    action: F,
    options: &ScheduleOptions,
    reporter: &dyn Reporter,
) -> Result<Vec<T>>
where
    T: Send + 'static,
    F: Fn(ProjectNode) -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let cycles = find_cycles(graph)?;
    report_cycles(&cycles, options.reject_on_cycle, reporter)?;
    let mut batcher = Batcher::new(projects, graph, merge_overlapping(&cycles))?;

    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let mut tasks: JoinSet<(String, Result<T>)> = JoinSet::new();
    let mut results = Vec::with_capacity(projects.len());
    let mut first_error: Option<Error> = None;
    let mut scheduled = 0usize;

    let mut batch = batcher.next_batch();
    loop {
        for name in batch.drain(..) {
            let node = graph.expect(&name)?.clone();
            let semaphore = Arc::clone(&semaphore);
            let fut = action(node);
            scheduled += 1;
            tasks.spawn(async move {
                // the semaphore is never closed
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("semaphore unexpectedly closed");
                (name, fut.await)
            });
        }

        let Some(joined) = tasks.join_next().await else {
            break;
        };
        let (name, result) = joined.map_err(|error| Error::Internal(error.to_string()))?;

        match result {
            Ok(value) => {
                results.push(value);
                batcher.mark_done(&name);
                if first_error.is_none() {
                    batch = batcher.next_batch();
                }
            }
            Err(error) => {
                // the failed project keeps blocking its dependents
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }
    }

    if let Some(error) = first_error {
        return Err(error);
    }
    if scheduled != projects.len() {
        return Err(Error::ScheduleIncomplete {
            scheduled,
            requested: projects.len(),
        });
    }

    Ok(results)
}
