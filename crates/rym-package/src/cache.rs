//! On-disk artifact content cache keyed by artifact identity

use crate::coordinate::ArtifactId;
use crate::PackageError;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Content cache
///
/// Layout: `<root>/<group>/<artifact>/jars/<artifact>-<version>.jar`, with a
/// `.sha256` sidecar per entry. A verified entry is never overwritten; an
/// entry that fails verification is replaced by rename, so readers always
/// observe complete files.
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    root: PathBuf,
}

impl ArtifactCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cache location for an artifact
    pub fn entry_path(&self, id: &ArtifactId) -> PathBuf {
        self.root
            .join(&id.group)
            .join(&id.artifact)
            .join("jars")
            .join(format!("{}-{}.jar", id.artifact, id.version))
    }

    fn digest_path(&self, id: &ArtifactId) -> PathBuf {
        let mut path = self.entry_path(id).into_os_string();
        path.push(".sha256");
        PathBuf::from(path)
    }

    /// Store downloaded content for an artifact and return its cached path
    ///
    /// An existing entry that matches its recorded digest is kept as-is. A
    /// corrupt entry, or one missing its digest, is replaced by `content`.
    pub fn store(&self, id: &ArtifactId, content: &Path) -> crate::Result<PathBuf> {
        let target = self.entry_path(id);
        if self.verify(id)? {
            return Ok(target);
        }

        let parent = target
            .parent()
            .ok_or_else(|| PackageError::Cache(format!("no parent for {}", target.display())))?;
        fs::create_dir_all(parent).map_err(|e| PackageError::io(parent, e))?;

        if content != target {
            // Copy under a temporary name so a partial file never sits at the entry path
            let staging = parent.join(format!(
                ".{}-{}.jar.partial",
                id.artifact, id.version
            ));
            fs::copy(content, &staging).map_err(|e| PackageError::io(content, e))?;
            fs::rename(&staging, &target).map_err(|e| PackageError::io(&target, e))?;
        }

        let digest = compute_digest(&target)?;
        let digest_path = self.digest_path(id);
        fs::write(&digest_path, format!("{}\n", digest))
            .map_err(|e| PackageError::io(&digest_path, e))?;

        Ok(target)
    }

    /// Check a cached entry against its recorded digest
    pub fn verify(&self, id: &ArtifactId) -> crate::Result<bool> {
        let target = self.entry_path(id);
        let digest_path = self.digest_path(id);
        if !target.is_file() || !digest_path.is_file() {
            return Ok(false);
        }

        let recorded =
            fs::read_to_string(&digest_path).map_err(|e| PackageError::io(&digest_path, e))?;
        Ok(recorded.trim() == compute_digest(&target)?)
    }
}

/// SHA-256 of a file as lowercase hex
pub fn compute_digest(path: &Path) -> crate::Result<String> {
    let content = fs::read(path).map_err(|e| PackageError::io(path, e))?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn id() -> ArtifactId {
        ArtifactId::new("org.agrona", "agrona", "1.6.0")
    }

    #[test]
    fn test_entry_layout() {
        let cache = ArtifactCache::new("/cache");
        assert_eq!(
            cache.entry_path(&id()),
            PathBuf::from("/cache/org.agrona/agrona/jars/agrona-1.6.0.jar")
        );
    }

    #[test]
    fn test_store_records_digest() {
        let temp = TempDir::new().unwrap();
        let download = temp.path().join("download.jar");
        fs::write(&download, b"content").unwrap();

        let cache = ArtifactCache::new(temp.path().join("cache"));
        assert!(!cache.verify(&id()).unwrap());

        let stored = cache.store(&id(), &download).unwrap();
        assert_eq!(stored, cache.entry_path(&id()));
        assert_eq!(fs::read(&stored).unwrap(), b"content");
        assert!(cache.verify(&id()).unwrap());
    }

    #[test]
    fn test_store_keeps_existing_entry() {
        let temp = TempDir::new().unwrap();
        let first = temp.path().join("first.jar");
        let second = temp.path().join("second.jar");
        fs::write(&first, b"first").unwrap();
        fs::write(&second, b"second").unwrap();

        let cache = ArtifactCache::new(temp.path().join("cache"));
        cache.store(&id(), &first).unwrap();
        let stored = cache.store(&id(), &second).unwrap();

        assert_eq!(fs::read(stored).unwrap(), b"first");
    }

    #[test]
    fn test_verify_detects_tampering() {
        let temp = TempDir::new().unwrap();
        let download = temp.path().join("download.jar");
        fs::write(&download, b"content").unwrap();

        let cache = ArtifactCache::new(temp.path().join("cache"));
        let stored = cache.store(&id(), &download).unwrap();
        fs::write(&stored, b"tampered").unwrap();

        assert!(!cache.verify(&id()).unwrap());
    }

    #[test]
    fn test_store_replaces_tampered_entry() {
        let temp = TempDir::new().unwrap();
        let download = temp.path().join("download.jar");
        fs::write(&download, b"content").unwrap();

        let cache = ArtifactCache::new(temp.path().join("cache"));
        let stored = cache.store(&id(), &download).unwrap();
        fs::write(&stored, b"tampered").unwrap();

        let restored = cache.store(&id(), &download).unwrap();
        assert_eq!(fs::read(&restored).unwrap(), b"content");
        assert!(cache.verify(&id()).unwrap());
    }

    #[test]
    fn test_store_replaces_entry_without_digest() {
        let temp = TempDir::new().unwrap();
        let download = temp.path().join("download.jar");
        fs::write(&download, b"content").unwrap();

        let cache = ArtifactCache::new(temp.path().join("cache"));
        let entry = cache.entry_path(&id());
        fs::create_dir_all(entry.parent().unwrap()).unwrap();
        fs::write(&entry, b"truncat").unwrap();

        let stored = cache.store(&id(), &download).unwrap();
        assert_eq!(fs::read(&stored).unwrap(), b"content");
        assert!(cache.verify(&id()).unwrap());
    }
}
