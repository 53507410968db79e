//! Wrapper script generation (rym wrap)

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Repository hosting rym releases
pub const DEFAULT_REPOSITORY: &str = "https://repo.maven.apache.org/maven2";

/// Wrapper script name
pub const WRAPPER_NAME: &str = "rymw";

/// Arguments for the wrap command
#[derive(Debug, Clone)]
pub struct WrapArgs {
    pub repository: String,
    pub version: String,
    pub output_dir: PathBuf,
    pub launcher_dir: PathBuf,
}

impl WrapArgs {
    /// Location of the downloaded release
    pub fn wrapped_path(&self) -> PathBuf {
        self.output_dir
            .join("wrapper")
            .join(format!("rym-{}", self.version))
    }

    /// Download URL of the pinned release
    pub fn wrapped_url(&self) -> String {
        format!(
            "{}/org/reaktivity/rym/{}/rym-{}",
            self.repository.trim_end_matches('/'),
            self.version,
            self.version
        )
    }
}

/// Wrapper script downloading the pinned release on first use
pub fn wrapper_script(wrapped_path: &Path, wrapped_url: &str) -> String {
    let lines = [
        "#!/bin/sh".to_string(),
        format!("wrappedPath=\"{}\"", wrapped_path.display()),
        format!("wrappedURL=\"{}\"", wrapped_url),
        "if [ ! -x \"$wrappedPath\" ]; then".to_string(),
        "  echo \"$wrappedPath not found, downloading from $wrappedURL\"".to_string(),
        "  mkdir -p \"$(dirname \"$wrappedPath\")\"".to_string(),
        "  if command -v curl > /dev/null; then".to_string(),
        "    curl -f -o \"$wrappedPath\" \"$wrappedURL\" || exit 1".to_string(),
        "    chmod +x \"$wrappedPath\"".to_string(),
        "  else".to_string(),
        "    echo \"curl missing, download failed\"".to_string(),
        "    exit 1".to_string(),
        "  fi".to_string(),
        "fi".to_string(),
        "exec \"$wrappedPath\" \"$@\"".to_string(),
    ];
    let mut script = lines.join("\n");
    script.push('\n');
    script
}

/// Run the wrap command
pub fn run(args: &WrapArgs) -> Result<()> {
    if args.version.trim().is_empty() {
        bail!("version not specified");
    }

    fs::create_dir_all(&args.launcher_dir)
        .with_context(|| format!("Failed to create {}", args.launcher_dir.display()))?;
    let path = args.launcher_dir.join(WRAPPER_NAME);
    let script = wrapper_script(&args.wrapped_path(), &args.wrapped_url());
    fs::write(&path, script).with_context(|| format!("Failed to write {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .with_context(|| format!("Failed to make {} executable", path.display()))?;
    }

    println!("Generated {}", path.display());
    Ok(())
}
