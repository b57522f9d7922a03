//! End-to-end preparation
//!
//! Select a variant, build its dependencies, and hand back the extension spec
//! once every artifact it names exists. This is the entry point for build
//! scripts; the CLI's `build` command is a thin wrapper around it.

use crate::config::Config;
use crate::download::TarballFetcher;
use crate::native::{
    AssemblyError, BuildEnvironment, BuildError, BuildPlan, BuildReport, BuildVariant,
    BuildVariantSelector, DependencyBuilder, ExtensionSpecAssembler, UnknownVariant,
};
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PrepareError {
    #[error(transparent)]
    Variant(#[from] UnknownVariant),

    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error("Failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Options for one preparation run
#[derive(Debug, Clone)]
pub struct PrepareOptions {
    /// Absolute project root
    pub root: PathBuf,
    /// Loaded configuration
    pub config: Config,
    /// Variant forced by the caller
    pub variant: Option<BuildVariant>,
    /// Capture toolchain output unless a command fails
    pub quiet: bool,
}

/// Outcome of a successful preparation
#[derive(Debug, Clone)]
pub struct Prepared {
    /// What was built and how
    pub plan: BuildPlan,
    /// Per-dependency timings and checksums
    pub report: BuildReport,
}

/// Select, build and verify.
///
/// # Errors
///
/// Returns the first failure from variant selection, the dependency build,
/// or the post-build artifact check.
pub async fn prepare(options: PrepareOptions) -> Result<Prepared, PrepareError> {
    let environment = BuildEnvironment::resolve(options.config.deployment_target.as_deref());
    let fetcher =
        TarballFetcher::with_timeout(options.config.timeout()).map_err(PrepareError::Client)?;

    let selector = BuildVariantSelector::new(options.root, options.config);
    let variant = selector.select(options.variant)?;
    info!(%variant, "selected build variant");

    let plan = selector.plan(variant);
    let builder = DependencyBuilder::new(plan.deps_dir.clone(), fetcher, environment)
        .with_quiet(options.quiet);
    let report = builder.build(&plan.dependencies).await?;

    ExtensionSpecAssembler::verify(&plan.extension)?;
    Ok(Prepared { plan, report })
}

/// Blocking wrapper around [`prepare`] for synchronous callers such as
/// `build.rs` scripts.
///
/// # Errors
///
/// Same as [`prepare`], plus [`PrepareError::Runtime`] if no runtime can be
/// started.
pub fn prepare_blocking(options: PrepareOptions) -> Result<Prepared, PrepareError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(PrepareError::Runtime)?;
    runtime.block_on(prepare(options))
}
