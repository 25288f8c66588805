//! Error types and result aliases.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error in {context}: {error}")]
    Toml {
        error: toml::de::Error,
        context: String,
    },

    #[error("Project not found: {name}. Known projects: {available}")]
    ProjectNotFound { name: String, available: String },

    #[error("Invalid version '{value}': {error}")]
    InvalidVersion { value: String, error: semver::Error },

    #[error("Invalid glob pattern '{pattern}': {error}")]
    InvalidPattern {
        pattern: String,
        error: glob::PatternError,
    },

    #[error("Dependency cycles detected:\n{}", paths.join("\n"))]
    CycleDetected { paths: Vec<String> },

    #[error("No projects matched the filters: {patterns}")]
    NoProjectsMatched { patterns: String },

    #[error("Version control query failed: {0}")]
    Git(String),

    #[error("Action failed for {project}: {message}")]
    Action { project: String, message: String },

    #[error("Dangling dependencies: {remaining} can never become ready")]
    DanglingDependencies { remaining: String },

    #[error("Scheduled {scheduled} of {requested} requested projects before the queue went idle")]
    ScheduleIncomplete { scheduled: usize, requested: usize },

    #[error("Internal scheduler error: {0}")]
    Internal(String),
}

impl Error {
    /// Short stable code for each failure kind, surfaced by the CLI.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Io(_) => "EIO",
            Error::Toml { .. } => "ETOML",
            Error::ProjectNotFound { .. } => "ENOPROJECT",
            Error::InvalidVersion { .. } => "EVERSION",
            Error::InvalidPattern { .. } => "EPATTERN",
            Error::CycleDetected { .. } => "ECYCLE",
            Error::NoProjectsMatched { .. } => "ENOMATCH",
            Error::Git(_) => "EGIT",
            Error::Action { .. } => "EACTION",
            Error::DanglingDependencies { .. }
            | Error::ScheduleIncomplete { .. }
            | Error::Internal(_) => "EINTERNAL",
        }
    }

    /// Internal invariant violations indicate a bug in the graph or
    /// scheduler rather than a user error.
    pub fn is_internal(&self) -> bool {
        self.code() == "EINTERNAL"
    }
}

pub type Result<T> = std::result::Result<T, Error>;
