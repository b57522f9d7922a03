//! Build variant selection
//!
//! Decides how the native libraries are obtained and produces the matching
//! build plan. Checks, in order:
//! - an explicit variant (CLI flag, `JQDEPS_VARIANT`, config file)
//! - a prebuilt shared `libjq` in the vendored tree -> vendored-prebuilt
//! - a vendored autoconf tree (`configure.ac`) -> vendored-builtin-static
//! - otherwise -> networked (fetch and build both releases)

use super::assembler::ExtensionSpecAssembler;
use super::types::{DependencySource, DependencySpec, ExtensionSpec};
use crate::commands;
use crate::config::Config;
use crate::env_vars;
use crate::paths::DependencyLayout;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Supported ways of obtaining jq and Oniguruma
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildVariant {
    /// Fetch both release archives, build Oniguruma into a private prefix,
    /// build jq against it, link both statically
    Networked,

    /// Link shared libraries already built in the vendored tree
    VendoredPrebuilt,

    /// Build the vendored tree in place with jq's bundled Oniguruma, fully static
    VendoredBuiltinStatic,
}

impl BuildVariant {
    /// All variants, in detection-precedence order
    pub const ALL: [Self; 3] = [
        Self::VendoredPrebuilt,
        Self::VendoredBuiltinStatic,
        Self::Networked,
    ];

    /// Name used in config files and on the command line
    #[must_use]
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Networked => "networked",
            Self::VendoredPrebuilt => "vendored-prebuilt",
            Self::VendoredBuiltinStatic => "vendored-builtin-static",
        }
    }
}

impl fmt::Display for BuildVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error(
    "unknown build variant `{0}` (expected networked, vendored-prebuilt or vendored-builtin-static)"
)]
pub struct UnknownVariant(pub String);

impl FromStr for BuildVariant {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

/// Everything needed to run one build invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    /// Selected variant
    pub variant: BuildVariant,
    /// Dependency working area
    pub deps_dir: PathBuf,
    /// Dependencies to build, in order
    pub dependencies: Vec<DependencySpec>,
    /// What the extension links against once the dependencies are built
    pub extension: ExtensionSpec,
}

/// Chooses a [`BuildVariant`] and turns it into a [`BuildPlan`].
#[derive(Debug, Clone)]
pub struct BuildVariantSelector {
    root: PathBuf,
    config: Config,
}

impl BuildVariantSelector {
    /// Selector for the project at `root` (should be absolute, since build
    /// commands receive paths derived from it).
    #[must_use]
    pub fn new(root: PathBuf, config: Config) -> Self {
        Self { root, config }
    }

    /// Pick the variant: `forced` -> `JQDEPS_VARIANT` -> config -> detection.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownVariant`] if `JQDEPS_VARIANT` names no variant.
    pub fn select(&self, forced: Option<BuildVariant>) -> Result<BuildVariant, UnknownVariant> {
        if let Some(variant) = forced {
            return Ok(variant);
        }
        if let Some(name) = env_vars::variant() {
            return name.parse();
        }
        if let Some(variant) = self.config.variant {
            return Ok(variant);
        }
        Ok(self.detect())
    }

    /// Detect the variant from what is present in the vendored tree.
    #[must_use]
    pub fn detect(&self) -> BuildVariant {
        let vendor_dir = self.config.vendor_dir(&self.root);

        let variant = if has_shared_libjq(&vendor_dir.join(".libs")) {
            BuildVariant::VendoredPrebuilt
        } else if vendor_dir.join("configure.ac").is_file() {
            BuildVariant::VendoredBuiltinStatic
        } else {
            BuildVariant::Networked
        };

        debug!(vendor_dir = %vendor_dir.display(), %variant, "detected build variant");
        variant
    }

    /// Build plan for `variant`.
    #[must_use]
    pub fn plan(&self, variant: BuildVariant) -> BuildPlan {
        let deps_dir = self.config.deps_dir(&self.root);
        let vendor_dir = self.config.vendor_dir(&self.root);
        let assembler = ExtensionSpecAssembler::new(
            self.config.extension_name(),
            self.config.sources(&self.root),
        );

        let (dependencies, extension) = match variant {
            BuildVariant::Networked => {
                let onig_version = self.config.oniguruma_version();
                let onig = DependencyLayout::new(
                    &deps_dir,
                    "onig",
                    onig_version,
                    &format!("onig-{onig_version}"),
                );
                let jq_version = self.config.jq_version();
                let jq = DependencyLayout::new(
                    &deps_dir,
                    "jq",
                    jq_version,
                    &format!("jq-{jq_version}"),
                );

                let onig_prefix = onig.install_dir.display().to_string();
                let specs = vec![
                    DependencySpec {
                        name: "oniguruma".to_string(),
                        source: DependencySource::Remote {
                            url: self.config.oniguruma_url(),
                            archive_path: onig.archive_path.clone(),
                        },
                        working_dir: onig.source_dir.clone(),
                        install_dir: Some(onig.install_dir.clone()),
                        build_commands: commands![
                            ["./configure", "CFLAGS=-fPIC", format!("--prefix={onig_prefix}")],
                            ["make"],
                            ["make", "install"],
                        ],
                        sha256: self.config.oniguruma.sha256.clone(),
                    },
                    DependencySpec {
                        name: "jq".to_string(),
                        source: DependencySource::Remote {
                            url: self.config.jq_url(),
                            archive_path: jq.archive_path.clone(),
                        },
                        working_dir: jq.source_dir.clone(),
                        install_dir: None,
                        build_commands: commands![
                            ["autoreconf", "-i"],
                            [
                                "./configure",
                                "CFLAGS=-fPIC",
                                "--disable-maintainer-mode",
                                format!("--with-oniguruma={onig_prefix}"),
                            ],
                            ["make"],
                        ],
                        sha256: self.config.jq.sha256.clone(),
                    },
                ];

                let extension = assembler.networked(&jq.source_dir, &onig.install_dir);
                (specs, extension)
            }

            BuildVariant::VendoredPrebuilt => {
                (Vec::new(), assembler.vendored_prebuilt(&vendor_dir))
            }

            BuildVariant::VendoredBuiltinStatic => {
                let spec = DependencySpec {
                    name: "jq".to_string(),
                    source: DependencySource::VendoredTree,
                    working_dir: vendor_dir.clone(),
                    install_dir: None,
                    build_commands: commands![
                        ["autoreconf", "-i"],
                        [
                            "./configure",
                            "CFLAGS=-fPIC",
                            "--disable-maintainer-mode",
                            "--with-oniguruma=builtin",
                            "--enable-all-static",
                            "--disable-shared",
                            "--enable-static",
                        ],
                        ["make"],
                    ],
                    sha256: None,
                };
                (vec![spec], assembler.vendored_builtin_static(&vendor_dir))
            }
        };

        BuildPlan {
            variant,
            deps_dir,
            dependencies,
            extension,
        }
    }
}

// libjq.so, libjq.so.1, libjq.1.dylib, ...
fn has_shared_libjq(libs_dir: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(libs_dir) else {
        return false;
    };

    entries.flatten().any(|entry| {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        name.starts_with("libjq.") && (name.contains(".so") || name.ends_with(".dylib"))
    })
}
