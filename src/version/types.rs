//! Common types for the version layer

use std::fmt;

/// Reference to a package within a catalog
///
/// For Helm repositories `source` is the repository base URL and `name` the
/// chart. For container registries `source` is the registry host and `name`
/// the repository path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageRef {
    pub source: String,
    pub name: String,
}

impl PackageRef {
    pub fn new(source: &str, name: &str) -> Self {
        Self {
            source: source.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source.trim_end_matches('/'), self.name)
    }
}

/// Raw version strings advertised for one package, in no particular order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageVersions {
    pub versions: Vec<String>,
}

impl PackageVersions {
    pub fn new(versions: Vec<String>) -> Self {
        Self { versions }
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}
