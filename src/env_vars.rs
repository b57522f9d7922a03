//! Environment variable handling.
//!
//! Every variable jqdeps reads lives here, one function each. Nothing in the
//! crate writes to the process environment; build commands receive an explicit
//! overlay instead (see [`crate::native::BuildEnvironment`]).

use std::env;

/// Name of the macOS deployment target variable propagated to build commands.
pub const DEPLOYMENT_TARGET_VAR: &str = "MACOSX_DEPLOYMENT_TARGET";

// Returns the value only when set and non-blank.
fn non_empty(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Get the host's macOS deployment target (`MACOSX_DEPLOYMENT_TARGET`).
pub fn deployment_target() -> Option<String> {
    non_empty(DEPLOYMENT_TARGET_VAR)
}

/// Get the forced build variant (`JQDEPS_VARIANT`).
pub fn variant() -> Option<String> {
    non_empty("JQDEPS_VARIANT")
}

/// Get the dependency working area override (`JQDEPS_DEPS_DIR`).
pub fn deps_dir() -> Option<String> {
    non_empty("JQDEPS_DEPS_DIR")
}

/// Get the config file override (`JQDEPS_CONFIG`).
pub fn config_path() -> Option<String> {
    non_empty("JQDEPS_CONFIG")
}

/// Get the HTTP timeout in seconds (`JQDEPS_TIMEOUT`), ignoring invalid values.
pub fn timeout_secs() -> Option<u64> {
    non_empty("JQDEPS_TIMEOUT").and_then(|s| s.parse().ok())
}

/// Get the XDG config home, used to locate the user config file.
pub fn xdg_config_home() -> Option<String> {
    non_empty("XDG_CONFIG_HOME")
}
