//! External collaborators of the pipeline.
//!
//! The pipeline never shells out directly. It talks to three seams:
//!
//! - [`BuildBackend`] turns the source tree into candidate distributions
//! - [`TargetInstaller`] installs a distribution and its dependency closure
//!   into an isolated directory
//! - [`ActiveEnvironment`] inspects and mutates the caller's environment
//!
//! [`Pip`] implements all three on top of `python -m pip`. Tests substitute
//! in-process fakes.

#![allow(async_fn_in_trait)] // Used only with concrete, non-spawned futures

mod pip;

pub use pip::Pip;

use crate::bundler::Result;
use std::path::Path;

/// Builds distributions from a source tree.
pub trait BuildBackend {
    /// Writes one or more candidate distribution files into `dist_dir`.
    ///
    /// Returns [`Error::Build`](crate::bundler::Error::Build) if the build
    /// tool reports failure.
    async fn build_distribution(&self, source_dir: &Path, dist_dir: &Path) -> Result<()>;
}

/// Installs distributions into an isolated root.
pub trait TargetInstaller {
    /// Installs `unit` and every dependency into `target_dir`.
    ///
    /// Must not touch any environment-global location. Unsatisfiable
    /// constraints are reported as
    /// [`Error::DependencyResolution`](crate::bundler::Error::DependencyResolution).
    async fn install_into(&self, unit: &Path, target_dir: &Path) -> Result<()>;
}

/// The caller's live environment.
pub trait ActiveEnvironment {
    /// Returns true if `project` is currently installed.
    async fn is_installed(&self, project: &str) -> Result<bool>;

    /// Removes `project`.
    async fn uninstall(&self, project: &str) -> Result<()>;

    /// Installs `unit`.
    async fn install(&self, unit: &Path) -> Result<()>;
}

/// Everything the pipeline needs from the outside world.
pub trait Toolchain: BuildBackend + TargetInstaller + ActiveEnvironment {}

impl<T: BuildBackend + TargetInstaller + ActiveEnvironment> Toolchain for T {}
