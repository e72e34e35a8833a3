//! binprep-core
//!
//! Core library for preparing executables for reverse-engineering analysis and
//! reporting on the results.
//!
//! This crate holds the cache-backed preparation pipeline (path resolution,
//! extraction, disassembly through an external analyzer), read-only access to
//! persisted analysis results, and the string-argument cross-reference reports
//! built on top of them.
//!
//! All substantive logic lives here so it is testable without the CLI.

pub mod cache;
pub mod config;
pub mod model;
pub mod paths;
pub mod pipeline;
pub mod report;
pub mod results;
pub mod tools;
pub mod util;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
