//! Lock reconciliation (ry.deps.lock) for reproducible installs

use crate::manifest::Manifest;
use crate::PackageError;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Where the authoritative manifest came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestSource {
    /// The lock snapshot, fully pinned and at least as new as the manifest
    Lock,
    /// The manifest itself, versions possibly unspecified
    Manifest,
}

/// Authoritative manifest for one invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub manifest: Manifest,
    pub source: ManifestSource,
}

/// Decides between the manifest and its lock snapshot, and persists the
/// pinned result.
#[derive(Debug, Clone)]
pub struct LockReconciler {
    manifest_path: PathBuf,
    lock_path: PathBuf,
}

impl LockReconciler {
    pub fn new(manifest_path: impl Into<PathBuf>, lock_path: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            lock_path: lock_path.into(),
        }
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Load the authoritative manifest
    ///
    /// The lock wins when it exists, parses, is fully pinned and was
    /// modified no earlier than the manifest. A missing or malformed manifest
    /// is fatal even when a usable lock exists.
    pub fn load(&self) -> crate::Result<Reconciled> {
        let manifest_modified = modified(&self.manifest_path).map_err(|e| {
            PackageError::manifest(&self.manifest_path, format!("cannot read file: {}", e))
        })?;
        let manifest = Manifest::from_file(&self.manifest_path)?;

        if let Some(lock) = self.usable_lock(manifest_modified) {
            return Ok(Reconciled {
                manifest: lock,
                source: ManifestSource::Lock,
            });
        }

        Ok(Reconciled {
            manifest,
            source: ManifestSource::Manifest,
        })
    }

    fn usable_lock(&self, manifest_modified: SystemTime) -> Option<Manifest> {
        let lock_modified = modified(&self.lock_path).ok()?;
        if lock_modified < manifest_modified {
            return None;
        }

        let lock = Manifest::from_file(&self.lock_path).ok()?;
        if !lock.is_pinned() || !lock.imports.is_empty() {
            return None;
        }

        Some(lock)
    }

    /// Read the current lock snapshot, if any
    pub fn current_lock(&self) -> Option<Manifest> {
        Manifest::from_file(&self.lock_path).ok()
    }

    /// Persist the pinned snapshot
    ///
    /// The lock file is rewritten only when the snapshot differs by value
    /// from the existing lock; otherwise it is left untouched so its
    /// timestamp is preserved. Returns whether the file was written.
    pub fn persist(&self, snapshot: &Manifest) -> crate::Result<bool> {
        if !snapshot.is_pinned() {
            let unpinned: Vec<String> = snapshot
                .dependencies
                .iter()
                .filter(|d| !d.is_pinned())
                .map(ToString::to_string)
                .collect();
            return Err(PackageError::Resolution(format!(
                "lock snapshot has unpinned dependencies: {}",
                unpinned.join(", ")
            )));
        }

        if let Some(existing) = self.current_lock() {
            if existing.lock_equivalent(snapshot) && existing.imports.is_empty() {
                return Ok(false);
            }
        }

        if let Some(parent) = self.lock_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| PackageError::io(parent, e))?;
            }
        }

        let mut lock = snapshot.clone();
        lock.imports.clear();
        lock.write_to_file(&self.lock_path)?;
        Ok(true)
    }
}

fn modified(path: &Path) -> std::io::Result<SystemTime> {
    std::fs::metadata(path)?.modified()
}
