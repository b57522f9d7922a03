//! CLI subcommands

pub(crate) mod build;
pub(crate) mod clean;
pub(crate) mod completion;
pub(crate) mod plan;
pub(crate) mod spec;

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Absolute project root: `--root` if given, else the current directory.
pub(crate) fn project_root(root: Option<PathBuf>) -> Result<PathBuf> {
    let root = root.unwrap_or_else(|| PathBuf::from("."));
    std::path::absolute(&root)
        .with_context(|| format!("Failed to resolve project root: {}", root.display()))
}
