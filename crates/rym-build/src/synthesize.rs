//! Descriptor synthesis for leaf automatic modules

use crate::archive::splice_descriptor;
use crate::descriptor::parse_module_info;
use crate::error::BuildResult;
use crate::graph::ModuleGraph;
use crate::report::Reporter;
use crate::tools::{CompileRequest, SynthesisFailure, Toolchain};
use rym_package::ArtifactId;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Promote every leaf automatic module that can be given a descriptor
///
/// Must run before delegation so promoted modules stay standalone. A
/// module whose descriptor cannot be inferred or compiled stays automatic
/// and the failure is reported as a warning. A name shared by several
/// artifacts is never promoted, so each of them is delegated instead.
/// Returns the promoted ids.
pub fn promote_leaves(
    graph: &mut ModuleGraph,
    toolchain: &Toolchain,
    work_dir: &Path,
    reporter: &mut Reporter,
) -> BuildResult<Vec<ArtifactId>> {
    let mut promoted = Vec::new();

    let mut claims: HashMap<String, usize> = HashMap::new();
    for module in graph.modules() {
        *claims.entry(module.name.clone()).or_default() += 1;
    }

    for id in graph.leaf_automatic() {
        let Some(module) = graph.get(&id) else {
            continue;
        };
        if claims.get(&module.name).copied().unwrap_or(0) > 1 {
            reporter.warn(format!(
                "module name {} is shared by several artifacts, leaving {} automatic",
                module.name, id
            ));
            continue;
        }
        let Some(archive) = module.archive.clone() else {
            continue;
        };
        let name = module.name.clone();
        let module_dir = work_dir.join(&name);

        let descriptor = match synthesize(toolchain, &name, &archive, &module_dir) {
            Ok(bytes) => bytes,
            Err(failure) => {
                reporter.warn(format!(
                    "unable to synthesize descriptor for {} ({}): {}",
                    name, id, failure
                ));
                continue;
            }
        };

        let parsed = match parse_module_info(&descriptor) {
            Ok(parsed) => parsed,
            Err(reason) => {
                reporter.warn(format!(
                    "synthesized descriptor for {} is unreadable: {}",
                    name, reason
                ));
                continue;
            }
        };

        let target = promoted_archive(work_dir, &name);
        splice_descriptor(&archive, &target, &descriptor)?;
        if graph.promote(&id, target, parsed) {
            reporter.info(format!("promoted {} to a named module", name));
            promoted.push(id);
        }
    }

    Ok(promoted)
}

fn promoted_archive(work_dir: &Path, name: &str) -> PathBuf {
    work_dir.join(format!("{}.jar", name))
}

fn synthesize(
    toolchain: &Toolchain,
    name: &str,
    archive: &Path,
    work_dir: &Path,
) -> Result<Vec<u8>, SynthesisFailure> {
    let source = toolchain
        .analyzer
        .infer_descriptor(archive, None, work_dir)?;

    toolchain.compiler.compile(&CompileRequest {
        module_name: name.to_string(),
        source,
        patch_archive: Some(archive.to_path_buf()),
        module_path: None,
        work_dir: work_dir.to_path_buf(),
    })
}
