//! Common test utilities and helpers
//!
//! This module provides shared functionality used across integration tests:
//! - Binary path resolution (via `jqdeps_binary`)
//! - Fake autoconf source archives and a local HTTP server (via `helpers`)

pub(crate) mod helpers;

#[allow(unused_imports)]
pub(crate) use helpers::jqdeps_binary;
