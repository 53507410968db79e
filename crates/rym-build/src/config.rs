//! Install configuration and derived output layout

use rym_package::{LOCK_FILENAME, MANIFEST_FILENAME};
use std::path::{Path, PathBuf};

/// Default name of the aggregate module absorbing unconstrained content
pub const DEFAULT_DELEGATE_NAME: &str = "rym.delegate";

/// Default launcher script name
pub const DEFAULT_LAUNCHER_NAME: &str = "ry";

/// Install configuration
///
/// Directory defaults follow the CLI: manifest in the current directory,
/// everything generated under `.rym`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallConfig {
    /// Directory containing `ry.deps`
    pub config_dir: PathBuf,
    /// Directory containing `ry.deps.lock` (defaults to `config_dir`)
    pub lock_dir: Option<PathBuf>,
    /// Artifact content cache
    pub cache_dir: PathBuf,
    /// Root of staged modules, generated sources and the runtime image
    pub output_dir: PathBuf,
    /// Directory receiving the launcher script
    pub launcher_dir: PathBuf,
    /// Launcher script file name
    pub launcher_name: String,
    /// Launcher entry point as `module[/class]`
    pub launcher_main: Option<String>,
    /// Name of the aggregate module
    pub delegate_name: String,
    /// Suppress informational output and the problem summary
    pub silent: bool,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("."),
            lock_dir: None,
            cache_dir: PathBuf::from(".rym/cache"),
            output_dir: PathBuf::from(".rym"),
            launcher_dir: PathBuf::from("."),
            launcher_name: DEFAULT_LAUNCHER_NAME.to_string(),
            launcher_main: None,
            delegate_name: DEFAULT_DELEGATE_NAME.to_string(),
            silent: false,
        }
    }
}

impl InstallConfig {
    /// Configuration rooted at a project directory
    pub fn for_project(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            config_dir: root.to_path_buf(),
            cache_dir: root.join(".rym").join("cache"),
            output_dir: root.join(".rym"),
            launcher_dir: root.to_path_buf(),
            ..Self::default()
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.config_dir.join(MANIFEST_FILENAME)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.lock_dir
            .as_deref()
            .unwrap_or(&self.config_dir)
            .join(LOCK_FILENAME)
    }

    /// Staged per-module archives
    pub fn modules_dir(&self) -> PathBuf {
        self.output_dir.join("modules")
    }

    /// Intermediate synthesis artifacts
    pub fn generated_dir(&self) -> PathBuf {
        self.output_dir.join("generated")
    }

    /// Linked runtime image
    pub fn image_dir(&self) -> PathBuf {
        self.output_dir.join("image")
    }

    pub fn launcher_path(&self) -> PathBuf {
        self.launcher_dir.join(&self.launcher_name)
    }
}
