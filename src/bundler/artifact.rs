//! Distribution building and selection.
//!
//! After the build collaborator runs, the dist directory is scanned for
//! wheels belonging to the project. Exactly one must match. Picking the first
//! of several would silently package whatever stale wheel sorts first, so
//! more than one match is an error just like none.

use crate::bundler::{
    error::{Error, Result},
    settings::normalize_distribution_name,
    toolchain::BuildBackend,
    utils::fs,
};
use std::path::{Path, PathBuf};

/// The single wheel produced for the project.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DistributableUnit {
    path: PathBuf,
    file_name: String,
}

impl DistributableUnit {
    /// Returns the wheel path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the wheel file name.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Returns the version component of the wheel file name, if present.
    pub fn version(&self) -> Option<&str> {
        self.file_name.split('-').nth(1)
    }
}

/// Runs the build collaborator and selects the resulting distribution.
pub async fn build_distribution<B: BuildBackend>(
    backend: &B,
    source_dir: &Path,
    dist_dir: &Path,
    project: &str,
) -> Result<DistributableUnit> {
    log::info!(
        "Building distribution for `{}` from {}",
        project,
        source_dir.display()
    );

    backend.build_distribution(source_dir, dist_dir).await?;
    let unit = select_distribution(dist_dir, project).await?;

    log::info!("✓ Built {}", unit.file_name());
    Ok(unit)
}

/// Finds the one wheel in `dist_dir` whose distribution name matches
/// `project`.
///
/// Names are compared in normalized form, so a project declared as
/// `My.Lib` matches `my_lib-1.0-py3-none-any.whl`. Wheels of other projects
/// (for example a dependency built alongside) are ignored.
///
/// # Errors
///
/// - [`Error::ArtifactNotFound`] if nothing matches
/// - [`Error::AmbiguousArtifact`] if more than one file matches
pub async fn select_distribution(dist_dir: &Path, project: &str) -> Result<DistributableUnit> {
    let wanted = normalize_distribution_name(project);
    let pattern = format!(
        "{}/*.whl",
        glob::Pattern::escape(&dist_dir.to_string_lossy())
    );

    let candidates = glob::glob(&pattern)
        .map_err(|e| Error::GenericError(format!("invalid artifact pattern {pattern}: {e}")))?;

    let mut matches = Vec::new();
    for candidate in candidates {
        let path = candidate.map_err(|e| Error::Fs {
            context: "scanning for distributions",
            path: e.path().to_path_buf(),
            error: e.into_error(),
        })?;
        if !path.is_file() {
            continue;
        }

        match distribution_name(&path) {
            Some(name) if normalize_distribution_name(name) == wanted => {
                log::debug!("  ✓ Candidate: {}", path.display());
                matches.push(path);
            }
            _ => log::debug!("  Skipping unrelated file: {}", path.display()),
        }
    }
    matches.sort();

    match matches.len() {
        0 => Err(Error::ArtifactNotFound {
            project: project.to_string(),
            dir: dist_dir.to_path_buf(),
            contents: fs::list_file_names(dist_dir).await?,
        }),
        1 => {
            let path = matches.remove(0);
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(DistributableUnit { path, file_name })
        }
        _ => Err(Error::AmbiguousArtifact {
            project: project.to_string(),
            dir: dist_dir.to_path_buf(),
            matches,
        }),
    }
}

/// Returns the distribution component of a wheel file name
/// (`{distribution}-{version}(-{build})?-{python}-{abi}-{platform}.whl`).
fn distribution_name(path: &Path) -> Option<&str> {
    let stem = path.file_stem()?.to_str()?;
    let (name, rest) = stem.split_once('-')?;
    if name.is_empty() || rest.is_empty() {
        return None;
    }
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distribution_name_is_first_component() {
        assert_eq!(
            distribution_name(Path::new("/d/my_lib-1.0.0-py3-none-any.whl")),
            Some("my_lib")
        );
        assert_eq!(distribution_name(Path::new("/d/nodash.whl")), None);
        assert_eq!(distribution_name(Path::new("/d/-1.0-py3-none-any.whl")), None);
    }

    #[test]
    fn unit_version_comes_from_file_name() {
        let unit = DistributableUnit {
            path: PathBuf::from("/d/mylib-2.1.0-py3-none-any.whl"),
            file_name: "mylib-2.1.0-py3-none-any.whl".into(),
        };
        assert_eq!(unit.version(), Some("2.1.0"));
    }
}
