//! Layer archive bundler for Python libraries
//!
//! This library provides the pipeline that turns a Python source tree into
//! a zip archive holding the library and every runtime dependency, laid out
//! for a function platform layer:
//! - build exactly one wheel
//! - install it with its closure into a pipeline-owned workspace
//! - zip the installed tree atomically
//! - replace the library in the active environment
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod bundler;
pub mod cli;
pub mod error;
pub mod metadata;

// Re-export commonly used types
pub use error::{BundlerError, CliError, Result};
