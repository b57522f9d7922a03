//! Dependency build orchestration
//!
//! Builds a list of native dependencies one after another: fetch, extract,
//! then run the toolchain. Order matters, since a later dependency's
//! `configure` may point at an earlier one's install prefix, so nothing runs
//! in parallel and the first failure ends the whole build.

use super::toolchain::{BuildCommandError, ToolchainRunner};
use super::types::{BuildEnvironment, BuildReport, BuiltDependency, DependencySource, DependencySpec};
use crate::download::{FetchError, TarballFetcher, compute_checksum};
use crate::extract::{ArchiveExtractor, ExtractionError, remove_path};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Command(#[from] BuildCommandError),

    #[error(
        "{dependent} references the install prefix of {dependency}, which is listed after it; build {dependency} first"
    )]
    OrderViolation {
        dependent: String,
        dependency: String,
    },

    #[error("Vendored source tree for {name} not found at {}", path.display())]
    MissingSourceTree { name: String, path: PathBuf },

    #[error("Failed to prepare {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    fn io(path: &Path) -> impl Fn(std::io::Error) -> Self {
        let path = path.to_path_buf();
        move |source| Self::Io {
            path: path.clone(),
            source,
        }
    }
}

/// Check that no spec references the install prefix of a spec listed after it.
///
/// # Errors
///
/// Returns [`BuildError::OrderViolation`] naming the first offending pair.
pub fn validate_order(specs: &[DependencySpec]) -> Result<(), BuildError> {
    for (i, dependent) in specs.iter().enumerate() {
        for dependency in specs.iter().skip(i + 1) {
            if let Some(prefix) = &dependency.install_dir
                && dependent.references(prefix)
            {
                return Err(BuildError::OrderViolation {
                    dependent: dependent.name.clone(),
                    dependency: dependency.name.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Builds native dependencies in order.
#[derive(Debug)]
pub struct DependencyBuilder {
    /// Base directory for archives, sources and install prefixes
    deps_dir: PathBuf,
    fetcher: TarballFetcher,
    extractor: ArchiveExtractor,
    runner: ToolchainRunner,
    environment: BuildEnvironment,
}

impl DependencyBuilder {
    /// Create a builder working under `deps_dir`.
    #[must_use]
    pub fn new(deps_dir: PathBuf, fetcher: TarballFetcher, environment: BuildEnvironment) -> Self {
        Self {
            deps_dir,
            fetcher,
            extractor: ArchiveExtractor::new(),
            runner: ToolchainRunner::default(),
            environment,
        }
    }

    /// Capture toolchain output, showing it only on failure
    #[must_use]
    pub const fn with_quiet(mut self, quiet: bool) -> Self {
        self.runner = ToolchainRunner::new(quiet);
        self
    }

    /// Build every spec, in order.
    ///
    /// All-or-nothing: the first failing stage aborts the call and no later
    /// dependency is started.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::OrderViolation`] before doing any work if the
    /// list is misordered, otherwise the first fetch, extraction or command
    /// failure.
    pub async fn build(&self, specs: &[DependencySpec]) -> Result<BuildReport, BuildError> {
        validate_order(specs)?;

        let mut report = BuildReport::default();
        for spec in specs {
            report.built.push(self.build_one(spec).await?);
        }

        info!(
            count = report.built.len(),
            seconds = report.total_duration().as_secs_f64(),
            "native dependencies built"
        );
        Ok(report)
    }

    async fn build_one(&self, spec: &DependencySpec) -> Result<BuiltDependency, BuildError> {
        let start_time = Instant::now();
        info!(name = %spec.name, "building dependency");

        std::fs::create_dir_all(&self.deps_dir).map_err(BuildError::io(&self.deps_dir))?;

        let archive_sha256 = match &spec.source {
            DependencySource::Remote { url, archive_path } => {
                remove_path(archive_path).map_err(BuildError::io(archive_path))?;
                let sha256 = self
                    .fetcher
                    .fetch(url, archive_path, spec.sha256.as_deref())
                    .await?;
                self.unpack(spec, archive_path)?;
                Some(sha256)
            }
            DependencySource::VendoredArchive { archive_path } => {
                let sha256 = compute_checksum(archive_path).map_err(BuildError::io(archive_path))?;
                self.unpack(spec, archive_path)?;
                Some(sha256)
            }
            DependencySource::VendoredTree => {
                if !spec.working_dir.is_dir() {
                    return Err(BuildError::MissingSourceTree {
                        name: spec.name.clone(),
                        path: spec.working_dir.clone(),
                    });
                }
                debug!(path = %spec.working_dir.display(), "building vendored tree in place");
                None
            }
        };

        let overlay = self.environment.overlay();
        self.runner
            .run(&spec.working_dir, &spec.build_commands, &overlay)?;

        let duration = start_time.elapsed();
        info!(name = %spec.name, seconds = duration.as_secs_f64(), "dependency built");

        Ok(BuiltDependency {
            name: spec.name.clone(),
            duration,
            archive_sha256,
            working_dir: spec.working_dir.clone(),
        })
    }

    // Replace the working directory with a fresh extraction of `archive`
    fn unpack(&self, spec: &DependencySpec, archive: &Path) -> Result<(), BuildError> {
        remove_path(&spec.working_dir).map_err(BuildError::io(&spec.working_dir))?;

        let parent = spec.working_dir.parent().unwrap_or(&self.deps_dir);
        let dir_name = spec
            .working_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| BuildError::Io {
                path: spec.working_dir.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "working directory has no final component",
                ),
            })?;

        self.extractor.extract(archive, parent, &dir_name)?;
        Ok(())
    }
}
