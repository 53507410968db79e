//! Install pipeline orchestration
use crate::assemble::ImageAssembler;
use crate::classify::classify;
use crate::config::InstallConfig;
use crate::error::{BuildError, BuildResult};
use crate::graph::{ModuleGraph, ModuleState};
use crate::report::Reporter;
use crate::synthesize::promote_leaves;
use crate::tools::Toolchain;

use rym_package::{ArtifactCache, ArtifactResolver, LockReconciler, ManifestSource, Resolver};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Install pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallState {
    Empty,
    /// Artifacts resolved
    Discovered,
    Classified,
    /// Leaves synthesized and automatic modules delegated
    Delegated,
    Staged,
    Linked,
    LauncherEmitted,
    Aborted,
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Empty => "empty",
            Self::Discovered => "discovered",
            Self::Classified => "classified",
            Self::Delegated => "delegated",
            Self::Staged => "staged",
            Self::Linked => "linked",
            Self::LauncherEmitted => "launcher emitted",
            Self::Aborted => "aborted",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of a successful install
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub state: InstallState,
    /// Staged module names, sorted
    pub staged: Vec<String>,
    pub artifacts: usize,
    pub named: usize,
    pub promoted: usize,
    pub delegated: usize,
    pub unnamed: usize,
    /// Whether the lock file was rewritten
    pub lock_updated: bool,
    pub image: PathBuf,
    pub launcher: PathBuf,
    pub total_time: Duration,
}

/// Drives one install from manifest to launcher
pub struct Installer<R: Resolver> {
    config: InstallConfig,
    resolver: R,
    toolchain: Toolchain,
    state: InstallState,
}

impl<R: Resolver> Installer<R> {
    pub fn new(config: InstallConfig, resolver: R, toolchain: Toolchain) -> Self {
        Self {
            config,
            resolver,
            toolchain,
            state: InstallState::Empty,
        }
    }

    pub fn state(&self) -> InstallState {
        self.state
    }

    pub fn config(&self) -> &InstallConfig {
        &self.config
    }

    /// Run the pipeline; on failure the state becomes `Aborted`
    pub fn install(&mut self, reporter: &mut Reporter) -> BuildResult<InstallReport> {
        match self.execute(reporter) {
            Ok(report) => Ok(report),
            Err(e) => {
                self.state = InstallState::Aborted;
                reporter.error(e.to_string());
                Err(e)
            }
        }
    }

    fn execute(&mut self, reporter: &mut Reporter) -> BuildResult<InstallReport> {
        let start = Instant::now();
        self.state = InstallState::Empty;

        let reconciler = LockReconciler::new(self.config.manifest_path(), self.config.lock_path());
        let reconciled = reconciler.load()?;
        let source = match reconciled.source {
            ManifestSource::Lock => reconciler.lock_path(),
            ManifestSource::Manifest => reconciler.manifest_path(),
        };
        reporter.info(format!(
            "using {} ({} dependencies)",
            source.display(),
            reconciled.manifest.dependencies.len()
        ));

        let manifest = reconciled.manifest;
        let mut resolver = ArtifactResolver::new(
            &mut self.resolver,
            manifest.repositories.clone(),
            ArtifactCache::new(&self.config.cache_dir),
        );
        let managed = resolver.resolve_imports(&manifest.imports)?;
        let resolution = resolver.resolve(&manifest.dependencies, &managed)?;

        let snapshot = manifest.snapshot(resolution.dependencies.clone());
        let lock_updated = reconciler.persist(&snapshot).map_err(BuildError::Lock)?;
        if lock_updated {
            reporter.info(format!("wrote {}", self.config.lock_path().display()));
        }
        self.state = InstallState::Discovered;
        reporter.info(format!("resolved {} artifacts", resolution.artifact_count()));

        let classified = classify(&resolution.artifacts, reporter)?;
        let mut graph = ModuleGraph::build(classified, self.config.delegate_name.clone());
        self.state = InstallState::Classified;

        let assembler = ImageAssembler::new(&self.config, &self.toolchain);
        assembler.prepare()?;

        let promoted = promote_leaves(
            &mut graph,
            &self.toolchain,
            &self.config.generated_dir(),
            reporter,
        )?;
        if !promoted.is_empty() {
            reporter.info(format!("synthesized {} module descriptors", promoted.len()));
        }
        let delegated = graph.delegate_automatic();
        self.state = InstallState::Delegated;
        if !delegated.is_empty() {
            reporter.info(format!(
                "delegated {} modules to {}",
                delegated.len(),
                graph.delegate().name
            ));
        }

        let staged = assembler.stage(&graph, reporter)?;
        self.state = InstallState::Staged;

        let image = assembler.link(&staged)?;
        self.state = InstallState::Linked;
        reporter.info(format!("linked image {}", image.display()));

        let launcher = assembler.emit_launcher()?;
        self.state = InstallState::LauncherEmitted;
        reporter.info(format!("wrote launcher {}", launcher.display()));

        Ok(InstallReport {
            state: self.state,
            staged,
            artifacts: resolution.artifact_count(),
            named: graph
                .standalone()
                .filter(|m| m.state() == ModuleState::Named)
                .count(),
            promoted: graph
                .standalone()
                .filter(|m| m.state() == ModuleState::AutomaticPromoted)
                .count(),
            delegated: delegated.len(),
            unnamed: graph.unnamed().len(),
            lock_updated,
            image,
            launcher,
            total_time: start.elapsed(),
        })
    }
}
