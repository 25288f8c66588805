//! Console implementation of the core's reporting sink.

use owo_colors::OwoColorize;

use lockstep_core::Reporter;

/// Prints core notices to stderr with colors; candidate details go through
/// `tracing` so they only show up with `-v`.
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn on_cycles(&self, paths: &[String]) {
        eprintln!(
            "{} dependency cycles detected; cycle members run as one batch:",
            "warning:".yellow().bold()
        );
        for path in paths {
            eprintln!("  {}", path);
        }
    }

    fn on_assume_all_changed(&self, reason: &str) {
        eprintln!(
            "{} {}, assuming all packages changed",
            "info:".cyan().bold(),
            reason
        );
    }

    fn on_candidate(&self, project: &str, reason: &str) {
        tracing::debug!(project, reason, "marked as changed");
    }
}
