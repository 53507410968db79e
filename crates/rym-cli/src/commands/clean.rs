//! Clean command (rym clean)

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Remove the output directory; absent output is not an error
pub fn run(output_dir: &Path, silent: bool) -> Result<()> {
    if !output_dir.exists() {
        return Ok(());
    }

    fs::remove_dir_all(output_dir)
        .with_context(|| format!("Failed to remove {}", output_dir.display()))?;
    if !silent {
        println!("Removed {}", output_dir.display());
    }
    Ok(())
}
