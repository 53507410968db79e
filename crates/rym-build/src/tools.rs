//! External toolchain capabilities
//!
//! The descriptor analyzer, descriptor compiler and image linker are
//! injected through traits so the pipeline runs unchanged against fakes.
//! The JDK implementations shell out to `jdeps`, `javac` and `jlink`.

use crate::error::{BuildError, BuildResult};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use thiserror::Error;
use walkdir::WalkDir;

/// Environment variable naming the JDK used for synthesis and linking
pub const JAVA_HOME_ENV: &str = "RYM_JAVA_HOME";

/// Descriptor inference or compilation did not produce a descriptor
#[derive(Debug, Error)]
pub enum SynthesisFailure {
    #[error("{tool} could not be started: {reason}")]
    Unavailable { tool: String, reason: String },

    #[error("{tool} exited with {status}: {output}")]
    Failed {
        tool: String,
        status: String,
        output: String,
    },

    #[error("{0}")]
    Missing(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Input to descriptor compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
    pub module_name: String,
    /// `module-info.java` source text
    pub source: String,
    /// Archive whose classes the descriptor describes
    pub patch_archive: Option<PathBuf>,
    /// Modules the descriptor may require
    pub module_path: Option<PathBuf>,
    /// Scratch directory for sources and class output
    pub work_dir: PathBuf,
}

/// Infers a module descriptor from bytecode
pub trait Analyzer {
    /// Produce `module-info.java` source for an archive
    fn infer_descriptor(
        &self,
        archive: &Path,
        module_path: Option<&Path>,
        work_dir: &Path,
    ) -> Result<String, SynthesisFailure>;
}

/// Compiles descriptor source to a binary `module-info.class`
pub trait DescriptorCompiler {
    fn compile(&self, request: &CompileRequest) -> Result<Vec<u8>, SynthesisFailure>;
}

/// Links staged modules into a runtime image
pub trait Linker {
    fn link(&self, modules_dir: &Path, roots: &[String], image_dir: &Path) -> BuildResult<()>;
}

/// Injected toolchain
pub struct Toolchain {
    pub analyzer: Box<dyn Analyzer>,
    pub compiler: Box<dyn DescriptorCompiler>,
    pub linker: Box<dyn Linker>,
}

impl Toolchain {
    pub fn new(
        analyzer: impl Analyzer + 'static,
        compiler: impl DescriptorCompiler + 'static,
        linker: impl Linker + 'static,
    ) -> Self {
        Self {
            analyzer: Box::new(analyzer),
            compiler: Box::new(compiler),
            linker: Box::new(linker),
        }
    }

    /// `jdeps`, `javac` and `jlink` from the given JDK, or from `PATH`
    pub fn jdk(java_home: Option<PathBuf>) -> Self {
        let jdk = Jdk::new(java_home);
        Self::new(
            JdepsAnalyzer::new(jdk.clone()),
            JavacCompiler::new(jdk.clone()),
            JlinkLinker::new(jdk),
        )
    }
}

/// Location of JDK tools
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Jdk {
    home: Option<PathBuf>,
}

impl Jdk {
    pub fn new(home: Option<PathBuf>) -> Self {
        Self { home }
    }

    /// `RYM_JAVA_HOME`, then `JAVA_HOME`
    pub fn from_env() -> Self {
        let home = [JAVA_HOME_ENV, "JAVA_HOME"]
            .iter()
            .filter_map(std::env::var_os)
            .find(|value| !value.is_empty())
            .map(PathBuf::from);
        Self { home }
    }

    pub fn home(&self) -> Option<&Path> {
        self.home.as_deref()
    }

    /// Path to a tool binary
    pub fn tool(&self, name: &str) -> PathBuf {
        match &self.home {
            Some(home) => home.join("bin").join(name),
            None => PathBuf::from(name),
        }
    }
}

fn run(tool: &Path, mut command: Command) -> Result<Output, SynthesisFailure> {
    let name = tool.display().to_string();
    let output = command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| SynthesisFailure::Unavailable {
            tool: name.clone(),
            reason: e.to_string(),
        })?
        .wait_with_output()
        .map_err(|e| SynthesisFailure::Unavailable {
            tool: name.clone(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        let mut text = String::from_utf8_lossy(&output.stdout).to_string();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        return Err(SynthesisFailure::Failed {
            tool: name,
            status: output.status.to_string(),
            output: text.trim().to_string(),
        });
    }

    Ok(output)
}

/// `jdeps --generate-module-info`
#[derive(Debug, Clone)]
pub struct JdepsAnalyzer {
    jdk: Jdk,
}

impl JdepsAnalyzer {
    pub fn new(jdk: Jdk) -> Self {
        Self { jdk }
    }
}

impl Analyzer for JdepsAnalyzer {
    fn infer_descriptor(
        &self,
        archive: &Path,
        module_path: Option<&Path>,
        work_dir: &Path,
    ) -> Result<String, SynthesisFailure> {
        let output_dir = work_dir.join("jdeps");
        if output_dir.exists() {
            fs::remove_dir_all(&output_dir)?;
        }
        fs::create_dir_all(&output_dir)?;

        let tool = self.jdk.tool("jdeps");
        let mut command = Command::new(&tool);
        if let Some(module_path) = module_path {
            command.arg("--module-path").arg(module_path);
        }
        command
            .arg("--generate-module-info")
            .arg(&output_dir)
            .arg(archive);
        run(&tool, command)?;

        // jdeps writes <output>/<module>/module-info.java
        let source = WalkDir::new(&output_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .find(|e| e.file_type().is_file() && e.file_name() == "module-info.java")
            .ok_or_else(|| {
                SynthesisFailure::Missing(format!(
                    "jdeps produced no module-info.java for {}",
                    archive.display()
                ))
            })?;

        Ok(fs::read_to_string(source.path())?)
    }
}

/// `javac` over a single `module-info.java`
#[derive(Debug, Clone)]
pub struct JavacCompiler {
    jdk: Jdk,
}

impl JavacCompiler {
    pub fn new(jdk: Jdk) -> Self {
        Self { jdk }
    }
}

impl DescriptorCompiler for JavacCompiler {
    fn compile(&self, request: &CompileRequest) -> Result<Vec<u8>, SynthesisFailure> {
        let source_dir = request.work_dir.join("src").join(&request.module_name);
        let class_dir = request.work_dir.join("classes").join(&request.module_name);
        fs::create_dir_all(&source_dir)?;
        if class_dir.exists() {
            fs::remove_dir_all(&class_dir)?;
        }
        fs::create_dir_all(&class_dir)?;

        let source_file = source_dir.join("module-info.java");
        fs::write(&source_file, &request.source)?;

        let tool = self.jdk.tool("javac");
        let mut command = Command::new(&tool);
        command.arg("-d").arg(&class_dir);
        if let Some(module_path) = &request.module_path {
            command.arg("--module-path").arg(module_path);
        }
        if let Some(archive) = &request.patch_archive {
            let mut patch = OsString::from(format!("{}=", request.module_name));
            patch.push(archive.as_os_str());
            command.arg("--patch-module").arg(patch);
        }
        command.arg(&source_file);
        run(&tool, command)?;

        let class_file = class_dir.join("module-info.class");
        fs::read(&class_file).map_err(|_| {
            SynthesisFailure::Missing(format!(
                "javac produced no module-info.class for {}",
                request.module_name
            ))
        })
    }
}

/// `jlink` producing a stripped runtime image
#[derive(Debug, Clone)]
pub struct JlinkLinker {
    jdk: Jdk,
}

impl JlinkLinker {
    pub fn new(jdk: Jdk) -> Self {
        Self { jdk }
    }

    fn module_path(&self, modules_dir: &Path) -> BuildResult<OsString> {
        let mut entries = vec![modules_dir.to_path_buf()];
        if let Some(home) = self.jdk.home() {
            entries.push(home.join("jmods"));
        }
        std::env::join_paths(entries).map_err(|e| BuildError::Link(e.to_string()))
    }
}

impl Linker for JlinkLinker {
    fn link(&self, modules_dir: &Path, roots: &[String], image_dir: &Path) -> BuildResult<()> {
        let tool = self.jdk.tool("jlink");
        let mut command = Command::new(&tool);
        command
            .arg("--module-path")
            .arg(self.module_path(modules_dir)?)
            .arg("--output")
            .arg(image_dir)
            .arg("--no-header-files")
            .arg("--no-man-pages")
            .arg("--strip-debug")
            .arg("--add-modules")
            .arg(roots.join(","));

        run(&tool, command).map_err(|failure| match failure {
            SynthesisFailure::Unavailable { tool, reason } => BuildError::tool(tool, reason),
            other => BuildError::Link(other.to_string()),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_lookup() {
        let jdk = Jdk::new(Some(PathBuf::from("/opt/jdk")));
        assert_eq!(jdk.tool("jlink"), PathBuf::from("/opt/jdk/bin/jlink"));
        assert_eq!(Jdk::default().tool("jlink"), PathBuf::from("jlink"));
    }

    #[test]
    fn test_missing_tool_is_unavailable() {
        let temp = tempfile::tempdir().unwrap();
        let jdk = Jdk::new(Some(temp.path().join("no-such-jdk")));
        let analyzer = JdepsAnalyzer::new(jdk);

        let failure = analyzer
            .infer_descriptor(&temp.path().join("a.jar"), None, temp.path())
            .unwrap_err();
        assert!(matches!(failure, SynthesisFailure::Unavailable { .. }));
    }

    #[test]
    fn test_missing_linker_is_tool_error() {
        let temp = tempfile::tempdir().unwrap();
        let linker = JlinkLinker::new(Jdk::new(Some(temp.path().join("no-such-jdk"))));

        let err = linker
            .link(temp.path(), &["foo".to_string()], &temp.path().join("image"))
            .unwrap_err();
        assert!(matches!(err, BuildError::Tool { .. }));
    }
}
