//! Build command
//!
//! Select a variant, build the native dependencies, print the extension spec

use anyhow::{Context, Result};
use jqdeps::{BuildVariant, Config, PrepareOptions, prepare};
use std::path::{Path, PathBuf};

/// Options for the build command
#[derive(Debug)]
pub(crate) struct BuildOptions<'a> {
    pub root: Option<PathBuf>,
    pub config: Option<&'a Path>,
    pub variant: Option<BuildVariant>,
    pub quiet: bool,
    pub cargo: bool,
}

/// Build the native dependencies and print the resulting extension spec
pub(crate) async fn run(options: BuildOptions<'_>) -> Result<()> {
    let root = super::project_root(options.root)?;
    let config = Config::load(&root, options.config)?;

    let prepared = prepare(PrepareOptions {
        root,
        config,
        variant: options.variant,
        quiet: options.quiet,
    })
    .await
    .context("Native dependency build failed")?;

    for built in &prepared.report.built {
        eprintln!(
            "Built {} in {:.1}s",
            built.name,
            built.duration.as_secs_f64()
        );
        if jqdeps::is_debug_enabled()
            && let Some(sha256) = &built.archive_sha256
        {
            eprintln!("  archive sha256: {sha256}");
        }
    }

    super::spec::print_spec(&prepared.plan.extension, options.cargo)
}
