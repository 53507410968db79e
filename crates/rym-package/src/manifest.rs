//! Dependency manifest (ry.deps) and lock snapshot shape

use crate::coordinate::Coordinate;
use crate::PackageError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Default manifest file name
pub const MANIFEST_FILENAME: &str = "ry.deps";

/// Default lock file name
pub const LOCK_FILENAME: &str = "ry.deps.lock";

/// Repository location, in precedence order within a manifest
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Repository(pub String);

impl Repository {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn location(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Dependency manifest
///
/// A lock snapshot has the same shape with every dependency pinned and no
/// imports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub repositories: Vec<Repository>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<Coordinate>,
    #[serde(default)]
    pub dependencies: Vec<Coordinate>,
}

impl Manifest {
    pub fn new(repositories: Vec<Repository>, dependencies: Vec<Coordinate>) -> Self {
        Self {
            repositories,
            imports: Vec::new(),
            dependencies,
        }
    }

    /// Add managed-version imports
    pub fn with_imports(mut self, imports: Vec<Coordinate>) -> Self {
        self.imports = imports;
        self
    }

    /// Parse manifest from JSON string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Load manifest from file
    ///
    /// A missing or malformed file is a manifest error.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PackageError::manifest(path, format!("cannot read file: {}", e))
        })?;
        Self::from_str(&content).map_err(|e| PackageError::manifest(path, e))
    }

    /// Serialize to pretty JSON
    pub fn to_string(&self) -> Result<String, serde_json::Error> {
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        Ok(content)
    }

    /// Write manifest to file
    pub fn write_to_file(&self, path: &Path) -> crate::Result<()> {
        let content = self.to_string()?;
        std::fs::write(path, content).map_err(|e| PackageError::io(path, e))?;
        Ok(())
    }

    /// Whether every dependency carries a concrete version
    pub fn is_pinned(&self) -> bool {
        self.dependencies.iter().all(Coordinate::is_pinned)
    }

    /// Lock snapshot over the given pinned dependencies
    pub fn snapshot(&self, pinned: Vec<Coordinate>) -> Self {
        Self::new(self.repositories.clone(), pinned)
    }

    /// Value comparison used to decide whether a lock file needs rewriting
    ///
    /// Imports are excluded: a snapshot never carries them.
    pub fn lock_equivalent(&self, other: &Manifest) -> bool {
        self.repositories == other.repositories && self.dependencies == other.dependencies
    }
}
