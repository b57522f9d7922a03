//! Native dependency building
//!
//! Prepares the compiled C libraries a jq extension module links against:
//! Oniguruma (regular expressions) and libjq itself.
//!
//! Supported variants:
//! - Networked: fetch and build both release archives, link statically
//! - Vendored-prebuilt: link shared libraries from an already built tree
//! - Vendored-builtin-static: build a vendored tree with jq's bundled
//!   Oniguruma, link statically

pub mod assembler;
pub mod builder;
pub mod detector;
pub mod toolchain;
pub mod types;

pub use assembler::{AssemblyError, ExtensionSpecAssembler};
pub use builder::{BuildError, DependencyBuilder, validate_order};
pub use detector::{BuildPlan, BuildVariant, BuildVariantSelector, UnknownVariant};
pub use toolchain::{BuildCommandError, ToolchainRunner};
pub use types::{
    BuildCommand, BuildEnvironment, BuildReport, BuiltDependency, DependencySource,
    DependencySpec, ExtensionSpec, Linkage,
};
