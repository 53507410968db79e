//! Shared fixtures: test jars, descriptor encoding and toolchain fakes
#![allow(dead_code)]

use rym_build::{
    Analyzer, BuildError, BuildResult, CompileRequest, DescriptorCompiler, Linker,
    SynthesisFailure, Toolchain,
};
use rym_package::{PackageError, ResolveReport, ResolveRequest, ResolvedNode, Resolver};
use std::cell::RefCell;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use zip::write::FileOptions;
use zip::ZipWriter;

/// Write a jar with the given entries
pub fn write_jar(path: &Path, entries: &[(&str, &[u8])]) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    for (name, content) in entries {
        zip.start_file(*name, FileOptions::default()).unwrap();
        zip.write_all(content).unwrap();
    }
    zip.finish().unwrap();
    path.to_path_buf()
}

/// Encode a minimal `module-info.class`
pub fn module_info(name: &str, requires: &[&str]) -> Vec<u8> {
    let mut pool: Vec<Vec<u8>> = Vec::new();
    fn utf8(pool: &mut Vec<Vec<u8>>, s: &str) -> u16 {
        let mut entry = vec![1];
        entry.extend_from_slice(&(s.len() as u16).to_be_bytes());
        entry.extend_from_slice(s.as_bytes());
        pool.push(entry);
        pool.len() as u16
    }
    fn module(pool: &mut Vec<Vec<u8>>, s: &str) -> u16 {
        let name = utf8(pool, s);
        pool.push([vec![19], name.to_be_bytes().to_vec()].concat());
        pool.len() as u16
    }

    let this_name = utf8(&mut pool, "module-info");
    pool.push([vec![7], this_name.to_be_bytes().to_vec()].concat());
    let this_class = pool.len() as u16;
    let attribute_name = utf8(&mut pool, "Module");
    let module_index = module(&mut pool, name);
    let requires: Vec<u16> = requires.iter().map(|r| module(&mut pool, r)).collect();

    let mut body = Vec::new();
    body.extend_from_slice(&module_index.to_be_bytes());
    body.extend_from_slice(&[0, 0, 0, 0]);
    body.extend_from_slice(&(requires.len() as u16).to_be_bytes());
    for index in requires {
        body.extend_from_slice(&index.to_be_bytes());
        body.extend_from_slice(&[0, 0, 0, 0]);
    }
    body.extend_from_slice(&[0; 8]);

    let mut class = vec![0xCA, 0xFE, 0xBA, 0xBE, 0, 0, 0, 53];
    class.extend_from_slice(&((pool.len() + 1) as u16).to_be_bytes());
    for entry in pool {
        class.extend_from_slice(&entry);
    }
    class.extend_from_slice(&0x8000u16.to_be_bytes());
    class.extend_from_slice(&this_class.to_be_bytes());
    class.extend_from_slice(&[0; 8]);
    class.extend_from_slice(&1u16.to_be_bytes());
    class.extend_from_slice(&attribute_name.to_be_bytes());
    class.extend_from_slice(&(body.len() as u32).to_be_bytes());
    class.extend_from_slice(&body);
    class
}

/// Calls observed by the toolchain fakes
#[derive(Debug, Default)]
pub struct Calls {
    pub analyzed: Vec<PathBuf>,
    pub compiled: Vec<CompileRequest>,
    pub linked: Vec<Vec<String>>,
}

pub type SharedCalls = Rc<RefCell<Calls>>;

/// Analyzer fake; fails for every archive when `fail` is set
pub struct FakeAnalyzer {
    pub fail: bool,
    pub calls: SharedCalls,
}

impl Analyzer for FakeAnalyzer {
    fn infer_descriptor(
        &self,
        archive: &Path,
        _module_path: Option<&Path>,
        _work_dir: &Path,
    ) -> Result<String, SynthesisFailure> {
        self.calls.borrow_mut().analyzed.push(archive.to_path_buf());
        if self.fail {
            return Err(SynthesisFailure::Missing(format!(
                "no descriptor for {}",
                archive.display()
            )));
        }
        Ok("module inferred {\n    requires java.base;\n}\n".to_string())
    }
}

/// Compiler fake encoding a descriptor for the requested module name
pub struct FakeCompiler {
    pub calls: SharedCalls,
}

impl DescriptorCompiler for FakeCompiler {
    fn compile(&self, request: &CompileRequest) -> Result<Vec<u8>, SynthesisFailure> {
        self.calls.borrow_mut().compiled.push(request.clone());
        Ok(module_info(&request.module_name, &["java.base"]))
    }
}

/// Linker fake; writes a stub `bin/java` unless `fail` is set
pub struct FakeLinker {
    pub fail: bool,
    pub calls: SharedCalls,
}

impl Linker for FakeLinker {
    fn link(&self, _modules_dir: &Path, roots: &[String], image_dir: &Path) -> BuildResult<()> {
        self.calls.borrow_mut().linked.push(roots.to_vec());
        if self.fail {
            return Err(BuildError::Link("unresolved module".to_string()));
        }
        fs::create_dir_all(image_dir.join("bin")).unwrap();
        fs::write(image_dir.join("bin").join("java"), "").unwrap();
        Ok(())
    }
}

/// Toolchain of fakes sharing one call log
pub fn fake_toolchain(analyzer_fails: bool, linker_fails: bool) -> (Toolchain, SharedCalls) {
    let calls = SharedCalls::default();
    let toolchain = Toolchain::new(
        FakeAnalyzer {
            fail: analyzer_fails,
            calls: calls.clone(),
        },
        FakeCompiler {
            calls: calls.clone(),
        },
        FakeLinker {
            fail: linker_fails,
            calls: calls.clone(),
        },
    );
    (toolchain, calls)
}

/// Resolver fake serving a fixed graph in depth-first listing order
pub struct GraphResolver {
    pub nodes: Vec<ResolvedNode>,
}

impl Resolver for GraphResolver {
    fn resolve(&mut self, request: &ResolveRequest) -> rym_package::Result<ResolveReport> {
        let mut listed = Vec::new();
        let mut stack: Vec<_> = request.coordinates.iter().rev().cloned().collect();
        while let Some(id) = stack.pop() {
            let node = self
                .nodes
                .iter()
                .find(|n| n.id == id)
                .ok_or_else(|| PackageError::Resolution(format!("not found: {}", id)))?;
            listed.push(node.clone());
            stack.extend(node.dependencies.iter().rev().cloned());
        }
        Ok(ResolveReport { nodes: listed })
    }
}
