//! jqdeps library code
//!
//! Fetches, builds and links the native libraries (jq and Oniguruma) a jq
//! extension module needs, and describes the result as an [`ExtensionSpec`].
//!
//! From a build script:
//!
//! ```rust,ignore
//! let root = std::path::absolute(".")?;
//! let config = jqdeps::Config::load(&root, None)?;
//! let prepared = jqdeps::prepare_blocking(jqdeps::PrepareOptions {
//!     root,
//!     config,
//!     variant: None,
//!     quiet: true,
//! })?;
//! for line in prepared.plan.extension.cargo_directives() {
//!     println!("{line}");
//! }
//! ```

pub mod config;
pub mod download;
pub mod env_vars;
pub mod extract;
pub mod logging;
pub mod native;
pub mod paths;
pub mod pipeline;

// Re-export common types for convenience
pub use config::Config;
pub use download::{FetchError, TarballFetcher};
pub use extract::{ArchiveExtractor, ExtractionError};
pub use logging::{init_logging, is_debug_enabled};
pub use native::{
    BuildCommand, BuildCommandError, BuildEnvironment, BuildError, BuildPlan, BuildReport,
    BuildVariant, BuildVariantSelector, DependencyBuilder, DependencySource, DependencySpec,
    ExtensionSpec, ExtensionSpecAssembler, Linkage, ToolchainRunner,
};
pub use pipeline::{PrepareError, PrepareOptions, Prepared, prepare, prepare_blocking};
