//! Version-control query interface consumed by the change collector.

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Description of the most recent tag reachable from the current tip.
#[derive(Debug, Clone)]
pub struct TagDescription {
    /// Tag name, e.g. `v1.2.0`.
    pub tag: String,
    /// Number of commits since the tag.
    pub ref_count: usize,
    /// Abbreviated sha of the current tip.
    pub sha: String,
}

/// Narrow seam to the version-control system.
///
/// The core treats these as pure queries; implementations issue the actual
/// describe/diff commands.
pub trait VersionControl {
    /// Returns the most recent tag description, or `None` when the
    /// repository has no tags.
    fn describe(&self) -> Result<Option<TagDescription>>;

    /// Returns the files changed since `committish`, restricted to
    /// `location`. An empty list means no diff.
    fn diff_since(&self, committish: &str, location: &Path) -> Result<Vec<PathBuf>>;
}
