//! Package manifest model parsed from `lockstep.toml`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Which dependency table an edge was declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyCollection {
    Dependencies,
    DevDependencies,
    OptionalDependencies,
}

impl DependencyCollection {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyCollection::Dependencies => "dependencies",
            DependencyCollection::DevDependencies => "dev-dependencies",
            DependencyCollection::OptionalDependencies => "optional-dependencies",
        }
    }
}

/// Immutable package snapshot read at graph-build time.
///
/// Dependency tables map a depended-on package name to a version
/// requirement string. `location` is the manifest's directory and is filled
/// in by the loader, not the TOML itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub private: bool,
    #[serde(skip)]
    pub location: PathBuf,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, rename = "dev-dependencies")]
    pub dev_dependencies: BTreeMap<String, String>,
    #[serde(default, rename = "optional-dependencies")]
    pub optional_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,
}

impl Manifest {
    /// Parses a manifest from TOML text.
    ///
    /// `context` names the source for error messages; `location` is the
    /// directory holding the manifest.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML does not parse into a manifest.
    pub fn from_toml(content: &str, context: &str, location: impl Into<PathBuf>) -> Result<Self> {
        let mut manifest: Manifest = toml::from_str(content).map_err(|error| Error::Toml {
            error,
            context: context.to_string(),
        })?;
        manifest.location = location.into();
        Ok(manifest)
    }

    /// Parsed semantic version.
    ///
    /// # Errors
    ///
    /// Returns an error if the version string is not valid semver.
    pub fn parsed_version(&self) -> Result<Version> {
        Version::parse(&self.version).map_err(|error| Error::InvalidVersion {
            value: self.version.clone(),
            error,
        })
    }

    /// Whether the current version is a prerelease (`1.2.0-alpha.1`).
    pub fn is_prerelease(&self) -> bool {
        self.parsed_version()
            .map(|v| !v.pre.is_empty())
            .unwrap_or(false)
    }

    #[inline]
    pub fn script(&self, name: &str) -> Option<&str> {
        self.scripts.get(name).map(String::as_str)
    }

    /// The three dependency tables in declaration order.
    pub fn dependency_tables(&self) -> [(DependencyCollection, &BTreeMap<String, String>); 3] {
        [
            (DependencyCollection::Dependencies, &self.dependencies),
            (
                DependencyCollection::DevDependencies,
                &self.dev_dependencies,
            ),
            (
                DependencyCollection::OptionalDependencies,
                &self.optional_dependencies,
            ),
        ]
    }
}
