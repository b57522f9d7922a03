//! Configuration file management
//!
//! Reads jqdeps' TOML configuration from the project or the user's config
//! directory. Every key is optional; the defaults build jq 1.6 against
//! Oniguruma 6.9.4 from their upstream release archives.

use crate::native::BuildVariant;
use crate::paths::{DEFAULT_DEPS_DIR, DEFAULT_VENDOR_DIR, resolve};
use crate::{download, env_vars};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the project-local config file
pub const PROJECT_CONFIG_FILE: &str = "jqdeps.toml";

/// Default Oniguruma release
pub const DEFAULT_ONIGURUMA_VERSION: &str = "6.9.4";

/// Default jq release
pub const DEFAULT_JQ_VERSION: &str = "1.6";

const ONIGURUMA_URL_TEMPLATE: &str =
    "https://github.com/kkos/oniguruma/releases/download/v{version}/onig-{version}.tar.gz";

const JQ_URL_TEMPLATE: &str =
    "https://github.com/stedolan/jq/releases/download/jq-{version}/jq-{version}.tar.gz";

/// Application configuration loaded from TOML files
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Force a build variant instead of detecting one
    #[serde(default)]
    pub variant: Option<BuildVariant>,

    /// Dependency working area (relative to the project root)
    #[serde(default)]
    pub deps_dir: Option<String>,

    /// Vendored jq source tree (relative to the project root)
    #[serde(default)]
    pub vendor_dir: Option<String>,

    /// Extension module name
    #[serde(default)]
    pub extension_name: Option<String>,

    /// Binding sources compiled into the extension
    #[serde(default)]
    pub sources: Vec<String>,

    /// macOS deployment target passed to every build command
    #[serde(default)]
    pub deployment_target: Option<String>,

    /// HTTP timeout for archive downloads, in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Oniguruma release overrides
    #[serde(default)]
    pub oniguruma: LibrarySource,

    /// jq release overrides
    #[serde(default)]
    pub jq: LibrarySource,
}

/// Release overrides for one library
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LibrarySource {
    /// Release version
    #[serde(default)]
    pub version: Option<String>,
    /// Archive URL; `{version}` is substituted
    #[serde(default)]
    pub url: Option<String>,
    /// Expected SHA-256 of the archive
    #[serde(default)]
    pub sha256: Option<String>,
}

impl LibrarySource {
    fn version_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.version.as_deref().unwrap_or(default)
    }

    fn url_or(&self, template: &str, version: &str) -> String {
        self.url
            .as_deref()
            .unwrap_or(template)
            .replace("{version}", version)
    }
}

impl Config {
    /// Load configuration for the project at `root`.
    ///
    /// Priority: `custom_path` -> `JQDEPS_CONFIG` -> `<root>/jqdeps.toml` ->
    /// user config (`~/.config/jqdeps/config.toml`) -> defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly requested file cannot be read, or if
    /// any config file that exists fails to parse.
    pub fn load(root: &Path, custom_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = custom_path {
            return Self::load_from(path);
        }

        if let Some(path) = env_vars::config_path() {
            return Self::load_from(Path::new(&path));
        }

        let project = root.join(PROJECT_CONFIG_FILE);
        if project.is_file() {
            return Self::load_from(&project);
        }

        if let Some(config_dir) = Self::user_config_dir() {
            let user = config_dir.join("config.toml");
            if user.is_file() {
                return Self::load_from(&user);
            }
        }

        Ok(Self::default())
    }

    /// Load and parse one config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid config.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid TOML, unknown keys or unknown variants.
    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    fn user_config_dir() -> Option<PathBuf> {
        // Check XDG_CONFIG_HOME first
        if let Some(xdg_config) = env_vars::xdg_config_home() {
            return Some(PathBuf::from(xdg_config).join("jqdeps"));
        }

        // Fall back to ~/.config/jqdeps
        dirs::home_dir().map(|home| home.join(".config").join("jqdeps"))
    }

    /// Dependency working area: `JQDEPS_DEPS_DIR` -> config -> `_deps`.
    #[must_use]
    pub fn deps_dir(&self, root: &Path) -> PathBuf {
        let dir = env_vars::deps_dir()
            .or_else(|| self.deps_dir.clone())
            .unwrap_or_else(|| DEFAULT_DEPS_DIR.to_string());
        resolve(root, dir)
    }

    /// Vendored jq tree location
    #[must_use]
    pub fn vendor_dir(&self, root: &Path) -> PathBuf {
        resolve(root, self.vendor_dir.as_deref().unwrap_or(DEFAULT_VENDOR_DIR))
    }

    /// Extension module name (default `jq`)
    #[must_use]
    pub fn extension_name(&self) -> &str {
        self.extension_name.as_deref().unwrap_or("jq")
    }

    /// Binding sources (default `jq.c`), resolved against `root`
    #[must_use]
    pub fn sources(&self, root: &Path) -> Vec<PathBuf> {
        if self.sources.is_empty() {
            vec![root.join("jq.c")]
        } else {
            self.sources.iter().map(|s| resolve(root, s)).collect()
        }
    }

    /// Download timeout: `JQDEPS_TIMEOUT` -> config -> default
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(
            env_vars::timeout_secs()
                .or(self.timeout_secs)
                .unwrap_or(download::DEFAULT_TIMEOUT_SECS),
        )
    }

    /// Oniguruma version
    #[must_use]
    pub fn oniguruma_version(&self) -> &str {
        self.oniguruma.version_or(DEFAULT_ONIGURUMA_VERSION)
    }

    /// Oniguruma release archive URL
    #[must_use]
    pub fn oniguruma_url(&self) -> String {
        self.oniguruma
            .url_or(ONIGURUMA_URL_TEMPLATE, self.oniguruma_version())
    }

    /// jq version
    #[must_use]
    pub fn jq_version(&self) -> &str {
        self.jq.version_or(DEFAULT_JQ_VERSION)
    }

    /// jq release archive URL
    #[must_use]
    pub fn jq_url(&self) -> String {
        self.jq.url_or(JQ_URL_TEMPLATE, self.jq_version())
    }
}
