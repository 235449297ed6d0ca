//! Isolated installation of the distribution and its dependency closure.

use crate::bundler::{
    artifact::DistributableUnit,
    error::{Error, ErrorExt, Result},
    toolchain::TargetInstaller,
};
use std::path::Path;

/// Installs `unit` and everything it depends on into `target_dir`.
///
/// `target_dir` is created if needed and must come from a freshly prepared
/// workspace; installing on top of an earlier tree would let files from a
/// previous run leak into the archive.
///
/// # Errors
///
/// - [`Error::DependencyResolution`] if the constraints cannot be satisfied
/// - [`Error::Install`] for every other installer or I/O failure
pub async fn materialize<I: TargetInstaller>(
    installer: &I,
    unit: &DistributableUnit,
    target_dir: &Path,
) -> Result<()> {
    log::info!(
        "Installing {} with dependencies into {}",
        unit.file_name(),
        target_dir.display()
    );

    tokio::fs::create_dir_all(target_dir)
        .await
        .fs_context("creating install target", target_dir)
        .map_err(|e| install_error(unit, target_dir, e))?;

    installer
        .install_into(unit.path(), target_dir)
        .await
        .map_err(|e| install_error(unit, target_dir, e))?;

    log::info!("✓ Materialized dependency tree");
    Ok(())
}

/// Keeps installer-classified errors and timeouts, folds everything else
/// into [`Error::Install`].
fn install_error(unit: &DistributableUnit, target_dir: &Path, error: Error) -> Error {
    match error {
        e @ (Error::DependencyResolution { .. } | Error::Install { .. } | Error::Timeout { .. }) => e,
        other => Error::Install {
            unit: unit.path().to_path_buf(),
            target: target_dir.to_path_buf(),
            reason: other.to_string(),
        },
    }
}
