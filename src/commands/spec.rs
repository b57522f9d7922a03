//! Spec command
//!
//! Print the extension spec for the selected variant without building

use anyhow::{Context, Result};
use jqdeps::{BuildVariant, BuildVariantSelector, Config, ExtensionSpec};
use std::path::{Path, PathBuf};

/// Print the extension spec the selected variant would produce
pub(crate) fn run(
    root: Option<PathBuf>,
    config_path: Option<&Path>,
    variant: Option<BuildVariant>,
    cargo: bool,
) -> Result<()> {
    let root = super::project_root(root)?;
    let config = Config::load(&root, config_path)?;

    let selector = BuildVariantSelector::new(root, config);
    let variant = selector.select(variant)?;
    let plan = selector.plan(variant);

    print_spec(&plan.extension, cargo)
}

/// Print a spec as pretty JSON, or as Cargo directives
pub(crate) fn print_spec(spec: &ExtensionSpec, cargo: bool) -> Result<()> {
    if cargo {
        for line in spec.cargo_directives() {
            println!("{line}");
        }
    } else {
        let json = serde_json::to_string_pretty(spec).context("Failed to serialize extension spec")?;
        println!("{json}");
    }
    Ok(())
}
