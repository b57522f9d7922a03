//! Clean command
//!
//! Remove the dependency working area

use anyhow::{Context, Result};
use jqdeps::Config;
use std::path::{Path, PathBuf};

/// Remove downloaded archives, extracted sources and install prefixes
pub(crate) fn run(root: Option<PathBuf>, config_path: Option<&Path>, dry_run: bool) -> Result<()> {
    let root = super::project_root(root)?;
    let config = Config::load(&root, config_path)?;
    let deps_dir = config.deps_dir(&root);

    if !deps_dir.exists() {
        println!("Nothing to clean at {}", deps_dir.display());
        return Ok(());
    }

    if dry_run {
        println!("Would remove {}", deps_dir.display());
        return Ok(());
    }

    jqdeps::extract::remove_path(&deps_dir)
        .with_context(|| format!("Failed to remove {}", deps_dir.display()))?;
    println!("Removed {}", deps_dir.display());
    Ok(())
}
