//! Artifact resolution
//!
//! The repository client that downloads artifacts and reads their metadata
//! lives outside this crate behind the [`Resolver`] trait. [`ArtifactResolver`]
//! adapts it: it completes unversioned coordinates from imported managed
//! versions, submits a synthetic root, and turns the report into a
//! deterministic artifact set backed by the content cache.

use crate::cache::ArtifactCache;
use crate::coordinate::{ArtifactId, Coordinate, CoordinateKey};
use crate::manifest::Repository;
use crate::PackageError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Managed versions keyed by version-less coordinate
pub type ManagedVersions = BTreeMap<CoordinateKey, String>;

/// Request handed to the external resolver
///
/// `coordinates` are the direct dependencies of a synthetic root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveRequest {
    pub repositories: Vec<Repository>,
    pub cache: PathBuf,
    pub coordinates: Vec<ArtifactId>,
}

/// Resolver output, nodes in the resolver's listing order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveReport {
    #[serde(default)]
    pub nodes: Vec<ResolvedNode>,
}

/// One node of the resolved graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedNode {
    pub id: ArtifactId,
    /// Downloaded content, absent for metadata-only nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<PathBuf>,
    /// Declared direct dependencies
    #[serde(default)]
    pub dependencies: Vec<ArtifactId>,
    /// Declared dependency management entries
    #[serde(default)]
    pub managed: ManagedVersions,
}

impl ResolvedNode {
    pub fn new(id: ArtifactId) -> Self {
        Self {
            id,
            content: None,
            dependencies: Vec::new(),
            managed: ManagedVersions::new(),
        }
    }

    pub fn with_content(mut self, content: impl Into<PathBuf>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<ArtifactId>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_managed(mut self, managed: ManagedVersions) -> Self {
        self.managed = managed;
        self
    }
}

/// External artifact resolver capability
pub trait Resolver {
    /// Resolve the transitive graph below the requested coordinates
    ///
    /// An unresolved or conflicting coordinate is an error.
    fn resolve(&mut self, request: &ResolveRequest) -> crate::Result<ResolveReport>;
}

impl<R: Resolver + ?Sized> Resolver for Box<R> {
    fn resolve(&mut self, request: &ResolveRequest) -> crate::Result<ResolveReport> {
        (**self).resolve(request)
    }
}

impl<R: Resolver + ?Sized> Resolver for &mut R {
    fn resolve(&mut self, request: &ResolveRequest) -> crate::Result<ResolveReport> {
        (**self).resolve(request)
    }
}

/// Resolved artifact with cached content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub id: ArtifactId,
    pub path: PathBuf,
    /// Direct dependencies that also produced content
    pub depends_on: BTreeSet<ArtifactId>,
}

/// Outcome of resolving a manifest's dependencies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Declared dependencies with versions completed, in declaration order
    pub dependencies: Vec<Coordinate>,
    /// Transitive artifacts in resolver listing order, one per id
    pub artifacts: Vec<Artifact>,
}

impl Resolution {
    pub fn artifact_count(&self) -> usize {
        self.artifacts.len()
    }

    pub fn get(&self, id: &ArtifactId) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| &a.id == id)
    }
}

/// Adapter over an external [`Resolver`]
pub struct ArtifactResolver<R> {
    resolver: R,
    repositories: Vec<Repository>,
    cache: ArtifactCache,
}

impl<R: Resolver> ArtifactResolver<R> {
    pub fn new(resolver: R, repositories: Vec<Repository>, cache: ArtifactCache) -> Self {
        Self {
            resolver,
            repositories,
            cache,
        }
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    /// Resolve imports as a throwaway graph and collect managed versions
    ///
    /// Later imports do not override versions managed by earlier ones.
    pub fn resolve_imports(&mut self, imports: &[Coordinate]) -> crate::Result<ManagedVersions> {
        let mut managed = ManagedVersions::new();
        if imports.is_empty() {
            return Ok(managed);
        }

        let coordinates = imports
            .iter()
            .map(|import| {
                import.to_artifact_id().ok_or_else(|| {
                    PackageError::Resolution(format!("import {} has no version", import))
                })
            })
            .collect::<crate::Result<Vec<_>>>()?;

        let request = self.request(coordinates);
        let report = self.resolver.resolve(&request)?;
        for node in report.nodes {
            for (key, version) in node.managed {
                managed.entry(key).or_insert(version);
            }
        }

        Ok(managed)
    }

    /// Fill unversioned dependencies from managed versions
    pub fn complete(
        dependencies: &[Coordinate],
        managed: &ManagedVersions,
    ) -> crate::Result<Vec<Coordinate>> {
        let mut unresolved = Vec::new();
        let completed: Vec<Coordinate> = dependencies
            .iter()
            .map(|dep| match (&dep.version, managed.get(&dep.key())) {
                (Some(_), _) => dep.clone(),
                (None, Some(version)) => dep.with_version(version),
                (None, None) => {
                    unresolved.push(dep.to_string());
                    dep.clone()
                }
            })
            .collect();

        if !unresolved.is_empty() {
            return Err(PackageError::Resolution(format!(
                "no version declared or managed for {}",
                unresolved.join(", ")
            )));
        }

        Ok(completed)
    }

    /// Resolve the full transitive artifact set
    ///
    /// Every node that produced content becomes one [`Artifact`]; its
    /// dependency edges are restricted to targets that produced content too.
    /// Any error aborts before anything is returned.
    pub fn resolve(
        &mut self,
        dependencies: &[Coordinate],
        managed: &ManagedVersions,
    ) -> crate::Result<Resolution> {
        let completed = Self::complete(dependencies, managed)?;

        let mut coordinates = Vec::new();
        let mut requested = HashSet::new();
        for coordinate in &completed {
            if let Some(id) = coordinate.to_artifact_id() {
                if requested.insert(id.clone()) {
                    coordinates.push(id);
                }
            }
        }

        if coordinates.is_empty() {
            return Ok(Resolution {
                dependencies: completed,
                artifacts: Vec::new(),
            });
        }

        let request = self.request(coordinates);
        let report = self.resolver.resolve(&request)?;
        let nodes = dedup_nodes(report.nodes)?;

        let with_content: HashSet<&ArtifactId> = nodes
            .iter()
            .filter(|n| n.content.is_some())
            .map(|n| &n.id)
            .collect();

        let mut artifacts = Vec::new();
        for node in &nodes {
            let Some(content) = &node.content else {
                continue;
            };

            let path = self.cache.store(&node.id, content)?;
            let depends_on = node
                .dependencies
                .iter()
                .filter(|dep| *dep != &node.id && with_content.contains(dep))
                .cloned()
                .collect();

            artifacts.push(Artifact {
                id: node.id.clone(),
                path,
                depends_on,
            });
        }

        Ok(Resolution {
            dependencies: completed,
            artifacts,
        })
    }

    fn request(&self, coordinates: Vec<ArtifactId>) -> ResolveRequest {
        ResolveRequest {
            repositories: self.repositories.clone(),
            cache: self.cache.root().to_path_buf(),
            coordinates,
        }
    }
}

/// Collapse repeated listings of the same artifact
///
/// Identical repeats are dropped; repeats that disagree on content are a
/// conflict.
fn dedup_nodes(nodes: Vec<ResolvedNode>) -> crate::Result<Vec<ResolvedNode>> {
    let mut seen: HashMap<ArtifactId, usize> = HashMap::new();
    let mut unique: Vec<ResolvedNode> = Vec::new();

    for node in nodes {
        match seen.get(&node.id) {
            Some(&index) => {
                let existing = &mut unique[index];
                if let (Some(a), Some(b)) = (&existing.content, &node.content) {
                    if a != b {
                        return Err(PackageError::Resolution(format!(
                            "conflicting content for {}: {} and {}",
                            node.id,
                            a.display(),
                            b.display()
                        )));
                    }
                }
                if existing.content.is_none() {
                    existing.content = node.content;
                }
                for dep in node.dependencies {
                    if !existing.dependencies.contains(&dep) {
                        existing.dependencies.push(dep);
                    }
                }
            }
            None => {
                seen.insert(node.id.clone(), unique.len());
                unique.push(node);
            }
        }
    }

    Ok(unique)
}

/// Resolver backed by an external program
///
/// The program reads a JSON [`ResolveRequest`] on stdin and writes a JSON
/// [`ResolveReport`] on stdout. A non-zero exit status is a resolution error.
#[derive(Debug, Clone)]
pub struct CommandResolver {
    program: PathBuf,
}

impl CommandResolver {
    /// Default resolver program name
    pub const DEFAULT_PROGRAM: &'static str = "rym-resolve";

    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Default for CommandResolver {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PROGRAM)
    }
}

impl Resolver for CommandResolver {
    fn resolve(&mut self, request: &ResolveRequest) -> crate::Result<ResolveReport> {
        let input = serde_json::to_vec(request)?;

        let mut child = Command::new(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                PackageError::Resolution(format!(
                    "failed to start resolver {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&input)
                .map_err(|e| PackageError::Resolution(format!("resolver stdin: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| PackageError::Resolution(format!("resolver failed: {}", e)))?;

        if !output.status.success() {
            return Err(PackageError::Resolution(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| PackageError::Resolution(format!("malformed resolver report: {}", e)))
    }
}
