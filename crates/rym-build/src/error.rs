/// Install pipeline error types
use rym_package::PackageError;
use std::path::PathBuf;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Manifest error: {0}")]
    Manifest(PackageError),

    #[error("Dependency resolution failed: {0}")]
    Resolution(PackageError),

    #[error("Lock file error: {0}")]
    Lock(PackageError),

    #[error("Invalid archive {path}: {error}")]
    Archive {
        path: PathBuf,
        error: zip::result::ZipError,
    },

    #[error("Invalid module descriptor in {path}: {reason}")]
    Descriptor { path: PathBuf, reason: String },

    #[error("Failed to run {tool}: {error}")]
    Tool { tool: String, error: String },

    #[error("Link failed: {0}")]
    Link(String),

    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PackageError> for BuildError {
    fn from(error: PackageError) -> Self {
        if error.is_manifest_error() {
            Self::Manifest(error)
        } else {
            Self::Resolution(error)
        }
    }
}

impl BuildError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Create an archive error
    pub fn archive(path: impl Into<PathBuf>, error: zip::result::ZipError) -> Self {
        Self::Archive {
            path: path.into(),
            error,
        }
    }

    /// Create a descriptor error
    pub fn descriptor(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Descriptor {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a tool invocation error
    pub fn tool(tool: impl Into<String>, error: impl ToString) -> Self {
        Self::Tool {
            tool: tool.into(),
            error: error.to_string(),
        }
    }
}
