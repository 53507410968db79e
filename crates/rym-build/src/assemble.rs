//! Module staging, image linking and launcher emission

use crate::archive::{class_packages, descriptor_archive, merge_archives, splice_descriptor};
use crate::config::InstallConfig;
use crate::error::{BuildError, BuildResult};
use crate::graph::ModuleGraph;
use crate::report::Reporter;
use crate::tools::{CompileRequest, Toolchain};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Source of a module that forwards to the delegate
pub fn forwarder_source(name: &str, delegate: &str) -> String {
    format!("open module {} {{\n    requires transitive {};\n}}\n", name, delegate)
}

/// Fallback delegate descriptor exporting every class package
pub fn export_all_source(name: &str, packages: &[String]) -> String {
    let mut source = format!("open module {} {{\n", name);
    for package in packages {
        source.push_str(&format!("    exports {};\n", package));
    }
    source.push_str("}\n");
    source
}

/// Launcher script starting the linked image
pub fn launcher_script(image_dir: &Path, main: Option<&str>) -> String {
    let mut script = String::from("#!/bin/sh\nJLINK_VM_OPTIONS=\n");
    script.push_str(&format!(
        "exec \"{}\" $JLINK_VM_OPTIONS",
        image_dir.join("bin").join("java").display()
    ));
    if let Some(main) = main {
        script.push_str(&format!(" -m {}", main));
    }
    script.push_str(" \"$@\"\n");
    script
}

fn recreate_dir(dir: &Path) -> BuildResult<()> {
    if dir.exists() {
        fs::remove_dir_all(dir).map_err(|e| BuildError::io(dir, e))?;
    }
    fs::create_dir_all(dir).map_err(|e| BuildError::io(dir, e))
}

/// Stages the final module set and links it
pub struct ImageAssembler<'a> {
    config: &'a InstallConfig,
    toolchain: &'a Toolchain,
}

impl<'a> ImageAssembler<'a> {
    pub fn new(config: &'a InstallConfig, toolchain: &'a Toolchain) -> Self {
        Self { config, toolchain }
    }

    /// Empty the staging and generated directories
    pub fn prepare(&self) -> BuildResult<()> {
        recreate_dir(&self.config.modules_dir())?;
        recreate_dir(&self.config.generated_dir())
    }

    /// Stage every terminal module, returning staged names sorted
    ///
    /// Standalone modules are copied first, then the delegate archive, then
    /// one forwarder per delegating module name.
    pub fn stage(&self, graph: &ModuleGraph, reporter: &mut Reporter) -> BuildResult<Vec<String>> {
        let modules_dir = self.config.modules_dir();
        let mut staged = BTreeSet::new();

        for module in graph.standalone() {
            let Some(archive) = &module.archive else {
                continue;
            };
            if !staged.insert(module.name.clone()) {
                reporter.warn(format!(
                    "module {} from {} already staged, skipping",
                    module.name, module.id
                ));
                continue;
            }
            let target = self.staged_path(&module.name);
            fs::copy(archive, &target).map_err(|e| BuildError::io(&target, e))?;
        }

        let delegate = graph.delegate();
        if !delegate.is_empty() {
            if staged.contains(&delegate.name) {
                return Err(BuildError::descriptor(
                    &modules_dir,
                    format!("delegate module name '{}' is already taken", delegate.name),
                ));
            }
            self.stage_delegate(graph, reporter)?;
            staged.insert(delegate.name.clone());

            for module in graph.delegating() {
                if !staged.insert(module.name.clone()) {
                    reporter.warn(format!(
                        "module {} from {} already staged, skipping forwarder",
                        module.name, module.id
                    ));
                    continue;
                }
                self.stage_forwarder(&module.name, &delegate.name)?;
            }
        }

        reporter.info(format!("staged {} modules", staged.len()));
        Ok(staged.into_iter().collect())
    }

    fn staged_path(&self, name: &str) -> PathBuf {
        self.config.modules_dir().join(format!("{}.jar", name))
    }

    fn stage_delegate(&self, graph: &ModuleGraph, reporter: &mut Reporter) -> BuildResult<()> {
        let delegate = graph.delegate();
        let work_dir = self.config.generated_dir().join(&delegate.name);
        let merged = work_dir.join("merged.jar");
        let modules_dir = self.config.modules_dir();

        let contributors: Vec<&Path> = delegate.contents().collect();
        let summary = merge_archives(&contributors, &merged)?;
        for conflict in &summary.conflicts {
            reporter.warn(format!(
                "{} provided by both {} and {}; keeping the first",
                conflict.entry,
                conflict.kept.display(),
                conflict.skipped.display()
            ));
        }

        let source = match self
            .toolchain
            .analyzer
            .infer_descriptor(&merged, Some(&modules_dir), &work_dir)
        {
            Ok(source) => source,
            Err(failure) => {
                reporter.warn(format!(
                    "unable to infer descriptor for {}, exporting all packages: {}",
                    delegate.name, failure
                ));
                export_all_source(&delegate.name, &class_packages(&merged)?)
            }
        };

        let descriptor = self
            .toolchain
            .compiler
            .compile(&CompileRequest {
                module_name: delegate.name.clone(),
                source,
                patch_archive: Some(merged.clone()),
                module_path: Some(modules_dir),
                work_dir: work_dir.clone(),
            })
            .map_err(|failure| BuildError::tool("descriptor compiler", failure))?;

        splice_descriptor(&merged, &self.staged_path(&delegate.name), &descriptor)
    }

    fn stage_forwarder(&self, name: &str, delegate: &str) -> BuildResult<()> {
        let descriptor = self
            .toolchain
            .compiler
            .compile(&CompileRequest {
                module_name: name.to_string(),
                source: forwarder_source(name, delegate),
                patch_archive: None,
                module_path: Some(self.config.modules_dir()),
                work_dir: self.config.generated_dir().join(name),
            })
            .map_err(|failure| BuildError::tool("descriptor compiler", failure))?;

        descriptor_archive(&self.staged_path(name), &descriptor)
    }

    /// Link the staged modules into a fresh image
    pub fn link(&self, roots: &[String]) -> BuildResult<PathBuf> {
        let image_dir = self.config.image_dir();
        if image_dir.exists() {
            fs::remove_dir_all(&image_dir).map_err(|e| BuildError::io(&image_dir, e))?;
        }
        self.toolchain
            .linker
            .link(&self.config.modules_dir(), roots, &image_dir)?;
        Ok(image_dir)
    }

    /// Write the launcher script
    pub fn emit_launcher(&self) -> BuildResult<PathBuf> {
        let path = self.config.launcher_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }

        let script = launcher_script(&self.config.image_dir(), self.config.launcher_main.as_deref());
        fs::write(&path, script).map_err(|e| BuildError::io(&path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
                .map_err(|e| BuildError::io(&path, e))?;
        }

        Ok(path)
    }
}
