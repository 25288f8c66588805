//! Git-backed implementation of the core's version-control queries.

use std::path::{Path, PathBuf};
use std::process::Command;

use lockstep_core::{Error, Result, TagDescription, VersionControl};

/// Issues `git` subprocess queries rooted at the workspace directory.
pub struct GitCli {
    workspace_dir: PathBuf,
}

impl GitCli {
    pub fn new(workspace_dir: impl Into<PathBuf>) -> Self {
        Self {
            workspace_dir: workspace_dir.into(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<Option<String>> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.workspace_dir)
            .output()
            .map_err(|e| Error::Git(format!("failed to run git {}: {}", args.join(" "), e)))?;

        if !output.status.success() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&output.stdout).to_string()))
    }
}

impl VersionControl for GitCli {
    fn describe(&self) -> Result<Option<TagDescription>> {
        // `v1.2.0-3-gabc1234`; a non-zero exit means no tag exists
        let Some(output) = self.run(&["describe", "--long", "--abbrev=7"])? else {
            return Ok(None);
        };
        let description = parse_describe(&output).ok_or_else(|| {
            Error::Git(format!("unparsable describe output: {}", output.trim()))
        })?;
        Ok(Some(description))
    }

    fn diff_since(&self, committish: &str, location: &Path) -> Result<Vec<PathBuf>> {
        let location = location.to_string_lossy();
        let output = self
            .run(&["diff", "--name-only", committish, "--", location.as_ref()])?
            .ok_or_else(|| Error::Git(format!("git diff --name-only {committish} failed")))?;

        Ok(output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(PathBuf::from)
            .collect())
    }
}

fn parse_describe(output: &str) -> Option<TagDescription> {
    let mut parts = output.trim().rsplitn(3, '-');
    let sha = parts.next()?.strip_prefix('g')?.to_string();
    let ref_count = parts.next()?.parse().ok()?;
    let tag = parts.next()?.to_string();
    Some(TagDescription {
        tag,
        ref_count,
        sha,
    })
}
