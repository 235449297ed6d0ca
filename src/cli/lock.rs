//! Run-level lock around the workspace.
//!
//! The pipeline assumes it is the only writer of its workspace. Before a run
//! starts the CLI takes an exclusive advisory lock on `<workspace>.lock`, a
//! sibling of the workspace, and refuses to run if another process holds it.
//! The lock file itself is left in place; removing it would let a waiting
//! process lock a file that is no longer the one others open.

use crate::error::{CliError, Result};
use anyhow::Context;
use std::{
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
};

/// Held for the duration of a run; released on drop.
pub struct RunLock {
    path: PathBuf,
    #[cfg(unix)]
    _flock: nix::fcntl::Flock<File>,
    #[cfg(not(unix))]
    _file: File,
}

impl std::fmt::Debug for RunLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunLock").field("path", &self.path).finish()
    }
}

impl RunLock {
    /// Returns the lock file path for `workspace`.
    pub fn path_for(workspace: &Path) -> PathBuf {
        let name = workspace
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "workspace".to_string());
        workspace.with_file_name(format!("{name}.lock"))
    }

    /// Takes the lock without waiting.
    ///
    /// # Errors
    ///
    /// [`CliError::Locked`] if another process holds it.
    pub fn acquire(workspace: &Path) -> Result<Self> {
        let path = Self::path_for(workspace);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .with_context(|| format!("opening lock file {}", path.display()))?;

        #[cfg(unix)]
        {
            use nix::{
                errno::Errno,
                fcntl::{Flock, FlockArg},
            };

            match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
                Ok(flock) => {
                    log::debug!("Acquired run lock {}", path.display());
                    Ok(Self {
                        path,
                        _flock: flock,
                    })
                }
                Err((_, errno)) if errno == Errno::EWOULDBLOCK => Err(CliError::Locked {
                    lock_path: path.display().to_string(),
                }
                .into()),
                Err((_, errno)) => Err(anyhow::anyhow!(
                    "locking {}: {}",
                    path.display(),
                    errno.desc()
                )
                .into()),
            }
        }

        #[cfg(not(unix))]
        {
            log::debug!(
                "Advisory locking unavailable on this platform; not locking {}",
                path.display()
            );
            Ok(Self { path, _file: file })
        }
    }

    /// Returns the lock file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::BundlerError;

    #[test]
    fn lock_file_sits_beside_the_workspace() {
        assert_eq!(
            RunLock::path_for(Path::new("/tmp/project/.layer-build")),
            PathBuf::from("/tmp/project/.layer-build.lock")
        );
    }

    #[test]
    fn second_acquire_is_refused_until_release() {
        let temp = tempfile::TempDir::new().unwrap();
        let workspace = temp.path().join("ws");

        let first = RunLock::acquire(&workspace).unwrap();
        let second = RunLock::acquire(&workspace).unwrap_err();
        assert!(matches!(second, BundlerError::Cli(CliError::Locked { .. })));
        assert_eq!(second.exit_code(), 3);

        drop(first);
        assert!(RunLock::acquire(&workspace).is_ok());
    }
}
