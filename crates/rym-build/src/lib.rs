//! rym module installation
//!
//! Turns a resolved artifact set into a linked runtime image:
//! - Module classification (named, automatic, unnamed)
//! - Delegation of automatic modules into a single aggregate module
//! - Descriptor synthesis for leaf automatic modules
//! - Module staging, image linking and launcher emission

pub mod archive;
pub mod assemble;
pub mod classify;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod graph;
pub mod install;
pub mod report;
pub mod synthesize;
pub mod tools;

// Re-export main types
pub use archive::{merge_archives, MergeConflict, MergeSummary};
pub use assemble::{forwarder_source, launcher_script, ImageAssembler};
pub use classify::{classify, Classification, ClassifiedArtifact};
pub use config::{InstallConfig, DEFAULT_DELEGATE_NAME, DEFAULT_LAUNCHER_NAME};
pub use descriptor::{describe_archive, ModuleDescriptor};
pub use error::{BuildError, BuildResult};
pub use graph::{Delegate, Module, ModuleGraph, ModuleState};
pub use install::{InstallReport, InstallState, Installer};
pub use report::{Problem, Reporter, Severity};
pub use synthesize::promote_leaves;
pub use tools::{
    Analyzer, CompileRequest, DescriptorCompiler, Jdk, JdepsAnalyzer, JavacCompiler, JlinkLinker,
    Linker, SynthesisFailure, Toolchain,
};
