//! Native dependency type definitions
//!
//! A build is described entirely by data: which dependencies to build, where
//! their sources come from, the commands that build them, and what the
//! extension module should link against afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// One toolchain command as an explicit argument vector.
///
/// The first element is the program; the rest are passed through untouched.
/// No shell ever sees the command, so arguments need no quoting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct BuildCommand {
    argv: Vec<String>,
}

impl BuildCommand {
    /// Create a command from its arguments. Returns `None` for an empty vector.
    pub fn new<I, S>(args: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let argv: Vec<String> = args.into_iter().map(Into::into).collect();
        if argv.is_empty() {
            None
        } else {
            Some(Self { argv })
        }
    }

    /// Program to execute
    #[must_use]
    pub fn program(&self) -> &str {
        self.argv.first().map_or("", String::as_str)
    }

    /// Arguments after the program
    #[must_use]
    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or(&[])
    }

    /// Full argument vector
    #[must_use]
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Whether any argument names `path` or something inside it.
    ///
    /// Both whole arguments and `--flag=value` values are checked, matching on
    /// path components so `/d/onig-install` is not inside `/d/onig`. Relative
    /// values that climb out of `working_dir` (`../onig-install`) are resolved
    /// against it first.
    #[must_use]
    pub fn references(&self, path: &Path, working_dir: &Path) -> bool {
        if path.as_os_str().is_empty() {
            return false;
        }
        let target = normalize(path);

        self.argv.iter().any(|arg| {
            let value = arg.split_once('=').map(|(_, value)| value);
            [Some(arg.as_str()), value]
                .into_iter()
                .flatten()
                .filter_map(|candidate| {
                    let candidate = Path::new(candidate);
                    if candidate.is_absolute() {
                        Some(normalize(candidate))
                    } else if candidate.starts_with("..") {
                        Some(normalize(&working_dir.join(candidate)))
                    } else {
                        None
                    }
                })
                .any(|resolved| resolved.starts_with(&target))
        })
    }
}

// Lexically drop `.` and fold `..` without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

impl TryFrom<Vec<String>> for BuildCommand {
    type Error = &'static str;

    fn try_from(argv: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(argv).ok_or("build command must have at least a program name")
    }
}

impl From<BuildCommand> for Vec<String> {
    fn from(command: BuildCommand) -> Self {
        command.argv
    }
}

impl fmt::Display for BuildCommand {
    /// Shell-like rendering for logs; arguments with whitespace or quotes are
    /// single-quoted.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.argv.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            let needs_quotes = arg.is_empty()
                || arg
                    .chars()
                    .any(|c| c.is_whitespace() || matches!(c, '\'' | '"' | '$' | '\\'));
            if needs_quotes {
                write!(f, "'{}'", arg.replace('\'', r"'\''"))?;
            } else {
                f.write_str(arg)?;
            }
        }
        Ok(())
    }
}

/// Build a `Vec<BuildCommand>` from string-slice argument lists.
///
/// ```
/// let commands = jqdeps::commands![["make"], ["make", "install"]];
/// assert_eq!(commands.len(), 2);
/// ```
#[macro_export]
macro_rules! commands {
    ($([$($arg:expr),+ $(,)?]),* $(,)?) => {
        ::std::vec![$(
            $crate::native::BuildCommand::new([$(::std::string::String::from($arg)),+])
                .unwrap_or_else(|| ::std::unreachable!())
        ),*]
    };
}

/// Where a dependency's source tree comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DependencySource {
    /// Release tarball fetched over HTTP into `archive_path`
    Remote { url: String, archive_path: PathBuf },

    /// Tarball shipped with the project, extracted fresh on every build
    VendoredArchive { archive_path: PathBuf },

    /// Source tree already present at the working directory, built in place
    VendoredTree,
}

/// One native library to build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySpec {
    /// Library identifier (e.g. `oniguruma`, `jq`)
    pub name: String,

    /// Source location
    pub source: DependencySource,

    /// Extracted source tree; build commands run here
    pub working_dir: PathBuf,

    /// `make install` prefix, referenced by later dependencies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_dir: Option<PathBuf>,

    /// Commands run in order inside `working_dir`
    pub build_commands: Vec<BuildCommand>,

    /// Expected SHA-256 of the archive, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl DependencySpec {
    /// Remote URL, if the sources are fetched
    #[must_use]
    pub fn source_url(&self) -> Option<&str> {
        match &self.source {
            DependencySource::Remote { url, .. } => Some(url),
            _ => None,
        }
    }

    /// Local archive path, if the sources come from a tarball
    #[must_use]
    pub fn archive_path(&self) -> Option<&Path> {
        match &self.source {
            DependencySource::Remote { archive_path, .. }
            | DependencySource::VendoredArchive { archive_path } => Some(archive_path),
            DependencySource::VendoredTree => None,
        }
    }

    /// Whether any build command names `path` or something inside it
    #[must_use]
    pub fn references(&self, path: &Path) -> bool {
        self.build_commands
            .iter()
            .any(|cmd| cmd.references(path, &self.working_dir))
    }
}

/// Build-time environment overlaid onto every toolchain command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildEnvironment {
    /// macOS deployment target (`MACOSX_DEPLOYMENT_TARGET`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_deployment_target: Option<String>,
}

impl BuildEnvironment {
    /// Environment from an explicit setting, falling back to the host's
    /// `MACOSX_DEPLOYMENT_TARGET`.
    #[must_use]
    pub fn resolve(configured_target: Option<&str>) -> Self {
        Self {
            platform_deployment_target: configured_target
                .map(str::to_string)
                .or_else(crate::env_vars::deployment_target),
        }
    }

    /// Variables to set on top of the inherited environment
    #[must_use]
    pub fn overlay(&self) -> BTreeMap<String, String> {
        let mut overlay = BTreeMap::new();
        if let Some(target) = &self.platform_deployment_target {
            overlay.insert(
                crate::env_vars::DEPLOYMENT_TARGET_VAR.to_string(),
                target.clone(),
            );
        }
        overlay
    }
}

/// How the extension links its native dependencies.
///
/// A spec is either fully dynamic or fully static; the two cannot be mixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Linkage {
    /// Resolve shared libraries by name at load time
    Dynamic {
        library_dirs: Vec<PathBuf>,
        libraries: Vec<String>,
    },

    /// Embed these archives directly
    Static { static_objects: Vec<PathBuf> },
}

impl Linkage {
    /// Whether this is static linkage
    #[must_use]
    #[inline]
    pub const fn is_static(&self) -> bool {
        matches!(self, Self::Static { .. })
    }

    /// Human-readable description
    #[must_use]
    #[inline]
    pub const fn description(&self) -> &str {
        match self {
            Self::Dynamic { .. } => "dynamic",
            Self::Static { .. } => "static",
        }
    }
}

/// Compiler and linker configuration for the extension module.
///
/// Serializes to a flat object with `sources`, `include_dirs`,
/// `library_dirs`, `libraries`, `static_objects` and `extra_link_args`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "ExtensionSpecRepr", try_from = "ExtensionSpecRepr")]
pub struct ExtensionSpec {
    /// Extension module name
    pub name: String,
    /// Binding sources compiled into the extension
    pub sources: Vec<PathBuf>,
    /// Header search paths, highest priority first
    pub include_dirs: Vec<PathBuf>,
    /// How native libraries are linked
    pub linkage: Linkage,
    /// Extra linker flags
    pub extra_link_args: Vec<String>,
}

impl ExtensionSpec {
    /// Library search paths (empty for static linkage)
    #[must_use]
    pub fn library_dirs(&self) -> &[PathBuf] {
        match &self.linkage {
            Linkage::Dynamic { library_dirs, .. } => library_dirs,
            Linkage::Static { .. } => &[],
        }
    }

    /// Library names (empty for static linkage)
    #[must_use]
    pub fn libraries(&self) -> &[String] {
        match &self.linkage {
            Linkage::Dynamic { libraries, .. } => libraries,
            Linkage::Static { .. } => &[],
        }
    }

    /// Static archives (empty for dynamic linkage)
    #[must_use]
    pub fn static_objects(&self) -> &[PathBuf] {
        match &self.linkage {
            Linkage::Static { static_objects } => static_objects,
            Linkage::Dynamic { .. } => &[],
        }
    }

    /// Render as Cargo build-script directives.
    ///
    /// Static archives become a link search path plus `static=` library,
    /// derived from the `lib<name>.a` file name.
    #[must_use]
    pub fn cargo_directives(&self) -> Vec<String> {
        let mut lines = Vec::new();

        for dir in &self.include_dirs {
            lines.push(format!("cargo:include={}", dir.display()));
        }

        match &self.linkage {
            Linkage::Dynamic {
                library_dirs,
                libraries,
            } => {
                for dir in library_dirs {
                    lines.push(format!("cargo:rustc-link-search=native={}", dir.display()));
                }
                for lib in libraries {
                    lines.push(format!("cargo:rustc-link-lib=dylib={lib}"));
                }
            }
            Linkage::Static { static_objects } => {
                for archive in static_objects {
                    if let Some(dir) = archive.parent() {
                        lines.push(format!("cargo:rustc-link-search=native={}", dir.display()));
                    }
                    if let Some(lib) = static_lib_name(archive) {
                        lines.push(format!("cargo:rustc-link-lib=static={lib}"));
                    }
                }
            }
        }

        for arg in &self.extra_link_args {
            lines.push(format!("cargo:rustc-link-arg={arg}"));
        }

        lines
    }
}

// `.../libjq.a` -> `jq`
fn static_lib_name(archive: &Path) -> Option<String> {
    let file_name = archive.file_name()?.to_str()?;
    let stem = file_name.strip_suffix(".a")?;
    Some(stem.strip_prefix("lib").unwrap_or(stem).to_string())
}

/// Flat wire form of [`ExtensionSpec`].
#[derive(Debug, Serialize, Deserialize)]
struct ExtensionSpecRepr {
    name: String,
    sources: Vec<PathBuf>,
    include_dirs: Vec<PathBuf>,
    #[serde(default)]
    library_dirs: Vec<PathBuf>,
    #[serde(default)]
    libraries: Vec<String>,
    #[serde(default)]
    static_objects: Vec<PathBuf>,
    #[serde(default)]
    extra_link_args: Vec<String>,
}

impl From<ExtensionSpec> for ExtensionSpecRepr {
    fn from(spec: ExtensionSpec) -> Self {
        let (library_dirs, libraries, static_objects) = match spec.linkage {
            Linkage::Dynamic {
                library_dirs,
                libraries,
            } => (library_dirs, libraries, Vec::new()),
            Linkage::Static { static_objects } => (Vec::new(), Vec::new(), static_objects),
        };

        Self {
            name: spec.name,
            sources: spec.sources,
            include_dirs: spec.include_dirs,
            library_dirs,
            libraries,
            static_objects,
            extra_link_args: spec.extra_link_args,
        }
    }
}

impl TryFrom<ExtensionSpecRepr> for ExtensionSpec {
    type Error = String;

    fn try_from(repr: ExtensionSpecRepr) -> Result<Self, Self::Error> {
        let dynamic = !repr.library_dirs.is_empty() || !repr.libraries.is_empty();
        let linkage = match (dynamic, repr.static_objects.is_empty()) {
            (true, false) => {
                return Err(
                    "extension spec mixes dynamic libraries with static objects".to_string()
                );
            }
            (true, true) => Linkage::Dynamic {
                library_dirs: repr.library_dirs,
                libraries: repr.libraries,
            },
            (false, false) => Linkage::Static {
                static_objects: repr.static_objects,
            },
            (false, true) => {
                return Err("extension spec links no native libraries".to_string());
            }
        };

        Ok(Self {
            name: repr.name,
            sources: repr.sources,
            include_dirs: repr.include_dirs,
            linkage,
            extra_link_args: repr.extra_link_args,
        })
    }
}

/// Outcome of building one dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltDependency {
    /// Dependency name
    pub name: String,
    /// Wall-clock time spent fetching, extracting and building
    pub duration: Duration,
    /// SHA-256 of the archive the sources came from, if any
    pub archive_sha256: Option<String>,
    /// Directory the build ran in
    pub working_dir: PathBuf,
}

/// Result of a successful [`crate::native::DependencyBuilder::build`] call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Dependencies in the order they were built
    pub built: Vec<BuiltDependency>,
}

impl BuildReport {
    /// Total time across all dependencies
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.built.iter().map(|b| b.duration).sum()
    }
}
