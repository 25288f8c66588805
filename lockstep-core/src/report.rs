//! Trait for reporting non-fatal conditions.

/// Reporting sink used by the cycle analyzer, change collector, and filter.
///
/// The core never writes to stdout/stderr directly; callers inject an
/// implementation. The CLI prints, tests stay silent.
pub trait Reporter: Send + Sync {
    /// Reports dependency cycles that were detected but not rejected.
    fn on_cycles(&self, paths: &[String]);

    /// Reports that every project is being treated as changed, with the
    /// reason (no reference point, or a forced wildcard).
    fn on_assume_all_changed(&self, reason: &str);

    /// Reports a project entering the candidate set.
    fn on_candidate(&self, project: &str, reason: &str);
}

/// Reporter that discards everything.
pub struct NullReporter;

impl Reporter for NullReporter {
    fn on_cycles(&self, _paths: &[String]) {}
    fn on_assume_all_changed(&self, _reason: &str) {}
    fn on_candidate(&self, _project: &str, _reason: &str) {}
}
