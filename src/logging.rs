//! Logging setup
//!
//! The library logs through `tracing`; this module installs the stderr
//! subscriber for the CLI. `--debug` raises the default level to `debug`,
//! and `RUST_LOG` overrides both.

use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

static DEBUG_ENABLED: OnceLock<bool> = OnceLock::new();

/// Initialize logging from the command-line flag.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_logging(debug: bool) {
    if DEBUG_ENABLED.set(debug).is_err() {
        return;
    }

    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("jqdeps={default_level}")));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
    if installed.is_err() {
        // An embedding program already installed its own subscriber
        tracing::debug!("keeping existing tracing subscriber");
    }
}

/// Check if debug mode is enabled
pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.get().copied().unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_initialization_keeps_first_setting() {
        init_logging(true);
        init_logging(false);
        assert!(is_debug_enabled());
    }
}
