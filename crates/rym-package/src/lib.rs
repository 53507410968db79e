//! rym package management
//!
//! Dependency manifest (`ry.deps`) and lock snapshot (`ry.deps.lock`)
//! handling, lock reconciliation, and the adapter around the external
//! artifact resolver that turns declared coordinates into a transitive
//! artifact set backed by the local content cache.

pub mod cache;
pub mod coordinate;
pub mod lockfile;
pub mod manifest;
pub mod resolver;

pub use cache::ArtifactCache;
pub use coordinate::{ArtifactId, Coordinate, CoordinateKey, DEFAULT_GROUP};
pub use lockfile::{LockReconciler, ManifestSource, Reconciled};
pub use manifest::{Manifest, Repository, LOCK_FILENAME, MANIFEST_FILENAME};
pub use resolver::{
    Artifact, ArtifactResolver, CommandResolver, ManagedVersions, Resolution, ResolveReport,
    ResolveRequest, ResolvedNode, Resolver,
};

use std::path::PathBuf;

/// Package management errors
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("Invalid manifest {path}: {reason}")]
    Manifest { path: PathBuf, reason: String },

    #[error("Invalid coordinate '{0}': expected [group:]artifact[:version]")]
    InvalidCoordinate(String),

    #[error("Unable to resolve: {0}")]
    Resolution(String),

    #[error("Artifact cache error: {0}")]
    Cache(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PackageError {
    /// Create a manifest error
    pub fn manifest(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Manifest {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Whether the error happened before any resolution was attempted
    pub fn is_manifest_error(&self) -> bool {
        matches!(self, Self::Manifest { .. } | Self::InvalidCoordinate(_))
    }
}

pub type Result<T> = std::result::Result<T, PackageError>;
