//! Python interpreter detection and availability checking.

use crate::bundler::{
    error::{Error, Result},
    utils::process::{self, CommandLine},
};
use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

/// First of `python3`, `python` found in `PATH`.
///
/// Cached result to avoid repeated lookups.
pub static DEFAULT_PYTHON: LazyLock<Option<PathBuf>> = LazyLock::new(|| {
    ["python3", "python"].iter().find_map(|name| match which::which(name) {
        Ok(path) => {
            log::debug!("Found {} at: {}", name, path.display());
            Some(path)
        }
        Err(e) => {
            log::debug!("{} not found in PATH: {}", name, e);
            None
        }
    })
});

/// Resolves the configured interpreter to an executable path.
///
/// A bare name is looked up in `PATH`; when the default `python3` is
/// missing, `python` is tried as well. A path with a directory component must
/// exist as given.
pub fn resolve_python(requested: &Path) -> Result<PathBuf> {
    if requested.components().count() > 1 {
        return if requested.is_file() {
            Ok(requested.to_path_buf())
        } else {
            Err(Error::GenericError(format!(
                "Python interpreter {} does not exist",
                requested.display()
            )))
        };
    }

    match which::which(requested) {
        Ok(path) => Ok(path),
        Err(e) if requested == Path::new("python3") => DEFAULT_PYTHON.clone().ok_or_else(|| {
            Error::GenericError(format!(
                "no Python interpreter found in PATH ({e}). Install Python 3 or pass --python"
            ))
        }),
        Err(e) => Err(Error::GenericError(format!(
            "Python interpreter `{}` not found in PATH: {e}",
            requested.display()
        ))),
    }
}

/// Returns the `pip --version` banner of `python`.
///
/// Fails if pip is not importable by that interpreter.
pub async fn pip_version(python: &Path) -> Result<String> {
    let command = CommandLine::new(python).args(["-m", "pip", "--version"]);
    let output = process::run(&command).await?;

    if output.status.success() {
        let version = output.stdout.trim().to_string();
        log::info!("✓ pip available: {}", version);
        Ok(version)
    } else {
        log::warn!(
            "{} cannot run pip ({}). Stderr: {}",
            python.display(),
            output.status_description(),
            output.stderr.trim()
        );
        Err(Error::GenericError(format!(
            "pip is not available for {}: {}",
            python.display(),
            output.stderr.trim()
        )))
    }
}
