//! jqdeps command-line interface
//!
//! Builds the native jq and Oniguruma libraries for a jq extension module

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use jqdeps::BuildVariant;
use std::path::PathBuf;
use std::process;

/// Display an error and its chain of causes
fn display_error(err: &anyhow::Error) {
    eprintln!("error: {err}");

    let mut source = err.source();
    while let Some(err) = source {
        eprintln!("caused by: {err}");
        source = err.source();
    }
}

#[derive(Parser)]
#[command(name = "jqdeps")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fetch and build the native libraries for a jq extension", long_about = None)]
pub(crate) struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Path to a config file (overrides JQDEPS_CONFIG and jqdeps.toml discovery)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the native dependencies and print the extension spec
    Build {
        /// Project root (defaults to the current directory)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Build variant (networked, vendored-prebuilt, vendored-builtin-static)
        #[arg(long)]
        variant: Option<BuildVariant>,

        /// Capture toolchain output, showing it only when a command fails
        #[arg(long, short)]
        quiet: bool,

        /// Print Cargo build-script directives instead of JSON
        #[arg(long)]
        cargo: bool,
    },

    /// Show the selected variant and the commands a build would run
    Plan {
        /// Project root (defaults to the current directory)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Build variant (networked, vendored-prebuilt, vendored-builtin-static)
        #[arg(long)]
        variant: Option<BuildVariant>,
    },

    /// Print the extension spec without building anything
    Spec {
        /// Project root (defaults to the current directory)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Build variant (networked, vendored-prebuilt, vendored-builtin-static)
        #[arg(long)]
        variant: Option<BuildVariant>,

        /// Print Cargo build-script directives instead of JSON
        #[arg(long)]
        cargo: bool,
    },

    /// Remove the dependency working area
    Clean {
        /// Project root (defaults to the current directory)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Show what would be removed without removing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    jqdeps::init_logging(cli.debug);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Build {
            root,
            variant,
            quiet,
            cargo,
        } => {
            commands::build::run(commands::build::BuildOptions {
                root,
                config,
                variant,
                quiet,
                cargo,
            })
            .await
        }
        Commands::Plan { root, variant } => commands::plan::run(root, config, variant),
        Commands::Spec {
            root,
            variant,
            cargo,
        } => commands::spec::run(root, config, variant, cargo),
        Commands::Clean { root, dry_run } => commands::clean::run(root, config, dry_run),
        Commands::Completion { shell } => commands::completion::run(shell),
    };

    if let Err(e) = result {
        display_error(&e);
        process::exit(1);
    }
}

mod commands;
