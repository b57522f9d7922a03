//! Plan command
//!
//! Show what a build would do, without doing it

use anyhow::Result;
use jqdeps::{BuildVariant, BuildVariantSelector, Config, DependencySource};
use std::path::{Path, PathBuf};

/// Print the selected variant, each dependency and its commands
pub(crate) fn run(
    root: Option<PathBuf>,
    config_path: Option<&Path>,
    variant: Option<BuildVariant>,
) -> Result<()> {
    let root = super::project_root(root)?;
    let config = Config::load(&root, config_path)?;

    let selector = BuildVariantSelector::new(root, config);
    let variant = selector.select(variant)?;
    let plan = selector.plan(variant);

    println!("Variant: {}", plan.variant);
    println!("Linkage: {}", plan.extension.linkage.description());
    println!("Dependency directory: {}", plan.deps_dir.display());

    if plan.dependencies.is_empty() {
        println!("\nNothing to build.");
    }

    for dep in &plan.dependencies {
        println!("\n{}", dep.name);
        match &dep.source {
            DependencySource::Remote { url, archive_path } => {
                println!("  source:  {url}");
                println!("  archive: {}", archive_path.display());
            }
            DependencySource::VendoredArchive { archive_path } => {
                println!("  archive: {}", archive_path.display());
            }
            DependencySource::VendoredTree => println!("  source:  vendored tree (built in place)"),
        }
        println!("  workdir: {}", dep.working_dir.display());
        if let Some(install_dir) = &dep.install_dir {
            println!("  prefix:  {}", install_dir.display());
        }
        for command in &dep.build_commands {
            println!("  $ {command}");
        }
    }

    Ok(())
}
