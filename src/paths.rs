//! Filesystem layout of the dependency working area.
//!
//! Everything a build touches lives under one private directory (`_deps` by
//! default) next to the project:
//!
//! ```text
//! _deps/
//!   onig-6.9.4.tar.gz      downloaded archive
//!   onig-6.9.4/            extracted source tree
//!   onig-install-6.9.4/    `make install` prefix
//!   jq-1.6.tar.gz
//!   jq-1.6/
//! ```

use std::path::{Path, PathBuf};

/// Default name of the dependency working area.
pub const DEFAULT_DEPS_DIR: &str = "_deps";

/// Default location of a vendored jq source tree.
pub const DEFAULT_VENDOR_DIR: &str = "jq";

/// Resolve `path` against `root` unless it is already absolute.
#[must_use]
pub fn resolve(root: &Path, path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Paths for one dependency inside the working area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyLayout {
    /// Downloaded archive (`<stem>.tar.gz`)
    pub archive_path: PathBuf,
    /// Extracted source tree (`<stem>/`)
    pub source_dir: PathBuf,
    /// Install prefix (`<name>-install-<version>/`)
    pub install_dir: PathBuf,
}

impl DependencyLayout {
    /// Layout for `name` at `version` whose tarball unpacks to `<stem>/`.
    #[must_use]
    pub fn new(deps_dir: &Path, name: &str, version: &str, stem: &str) -> Self {
        Self {
            archive_path: deps_dir.join(format!("{stem}.tar.gz")),
            source_dir: deps_dir.join(stem),
            install_dir: deps_dir.join(format!("{name}-install-{version}")),
        }
    }
}
