//! Extension spec assembly
//!
//! Turns build outputs into the include paths, libraries and link flags the
//! extension compiler consumes. Each variant has one assembly rule, and every
//! rule yields either purely static or purely dynamic linkage.

use super::types::{ExtensionSpec, Linkage};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Linker flags every variant needs (jq uses libm).
const EXTRA_LINK_ARGS: &[&str] = &["-lm"];

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("Expected build artifact missing: {}", path.display())]
    MissingArtifact { path: PathBuf },
}

/// Builds [`ExtensionSpec`]s for the supported variants.
#[derive(Debug, Clone)]
pub struct ExtensionSpecAssembler {
    name: String,
    sources: Vec<PathBuf>,
}

impl ExtensionSpecAssembler {
    /// Assembler for an extension named `name` compiled from `sources`.
    #[must_use]
    pub fn new(name: impl Into<String>, sources: Vec<PathBuf>) -> Self {
        Self {
            name: name.into(),
            sources,
        }
    }

    fn spec(&self, include_dirs: Vec<PathBuf>, linkage: Linkage) -> ExtensionSpec {
        ExtensionSpec {
            name: self.name.clone(),
            sources: self.sources.clone(),
            include_dirs,
            linkage,
            extra_link_args: EXTRA_LINK_ARGS.iter().map(ToString::to_string).collect(),
        }
    }

    /// Both libraries built from release archives: link the jq archive from
    /// its build tree and the Oniguruma archive from its install prefix.
    #[must_use]
    pub fn networked(&self, jq_source_dir: &Path, oniguruma_install_dir: &Path) -> ExtensionSpec {
        self.spec(
            vec![jq_source_dir.join("src")],
            Linkage::Static {
                static_objects: vec![
                    jq_source_dir.join(".libs").join("libjq.a"),
                    oniguruma_install_dir.join("lib").join("libonig.a"),
                ],
            },
        )
    }

    /// A vendored tree that was already built with shared libraries.
    #[must_use]
    pub fn vendored_prebuilt(&self, vendor_dir: &Path) -> ExtensionSpec {
        self.spec(
            vec![vendor_dir.join("src")],
            Linkage::Dynamic {
                library_dirs: vec![vendor_dir.join(".libs"), oniguruma_libs(vendor_dir)],
                libraries: vec!["jq".to_string(), "onig".to_string()],
            },
        )
    }

    /// A vendored tree built in place with jq's bundled Oniguruma, fully static.
    #[must_use]
    pub fn vendored_builtin_static(&self, vendor_dir: &Path) -> ExtensionSpec {
        self.spec(
            vec![vendor_dir.join("src")],
            Linkage::Static {
                static_objects: vec![
                    vendor_dir.join(".libs").join("libjq.a"),
                    oniguruma_libs(vendor_dir).join("libonig.a"),
                ],
            },
        )
    }

    /// Check that every archive and directory named by `spec` exists.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError::MissingArtifact`] for the first missing path.
    pub fn verify(spec: &ExtensionSpec) -> Result<(), AssemblyError> {
        let paths = spec
            .static_objects()
            .iter()
            .chain(spec.library_dirs())
            .chain(&spec.include_dirs);

        for path in paths {
            if !path.exists() {
                return Err(AssemblyError::MissingArtifact { path: path.clone() });
            }
        }
        Ok(())
    }
}

// jq bundles Oniguruma as a submodule and builds it with libtool
fn oniguruma_libs(vendor_dir: &Path) -> PathBuf {
    vendor_dir
        .join("modules")
        .join("oniguruma")
        .join("src")
        .join(".libs")
}
