//! Ephemeral build workspace.
//!
//! The workspace lives at a fixed path owned by the pipeline. Whatever is
//! found there when a run starts (a finished build, the debris of a crashed
//! one, or a stray file) is removed before anything is staged, so no run ever
//! sees state from a previous one.
//!
//! Layout:
//!
//! ```text
//! <workspace>/
//!   dist/      build outputs (default dist directory)
//!   target/    isolated install root, archived as-is
//! ```

use crate::bundler::{
    error::{Error, Result},
    utils::fs,
};
use std::path::{Path, PathBuf};

const DIST_DIR: &str = "dist";
const TARGET_DIR: &str = "target";

/// A freshly prepared workspace.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Returns an empty, writable workspace at `root`.
    ///
    /// Existing content at `root` is removed first, whether it is a
    /// directory tree, a file or a symlink.
    ///
    /// # Errors
    ///
    /// [`Error::Workspace`] if the removal or the creation fails.
    pub async fn prepare(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let workspace_error = |source| Error::Workspace {
            path: root.clone(),
            source,
        };

        match fs::remove_path(&root).await {
            Ok(true) => log::info!("Removed previous workspace at {}", root.display()),
            Ok(false) => {}
            Err(e) => return Err(workspace_error(e)),
        }

        for dir in [root.join(DIST_DIR), root.join(TARGET_DIR)] {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(workspace_error)?;
        }

        log::debug!("Prepared workspace at {}", root.display());
        Ok(Self { root })
    }

    /// Returns the workspace root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the default directory for build outputs.
    pub fn dist_dir(&self) -> PathBuf {
        self.root.join(DIST_DIR)
    }

    /// Returns the archive root: the isolated install target without prefix.
    pub fn target_dir(&self) -> PathBuf {
        self.root.join(TARGET_DIR)
    }

    /// Returns the directory the installer writes into.
    ///
    /// Equal to [`target_dir`](Self::target_dir) unless a layer prefix is
    /// configured, in which case the tree goes one level deeper so that the
    /// prefix shows up inside the archive.
    pub fn install_dir(&self, layer_prefix: Option<&Path>) -> PathBuf {
        match layer_prefix {
            Some(prefix) => self.target_dir().join(prefix),
            None => self.target_dir(),
        }
    }

    /// Removes the workspace. Removing an already missing workspace succeeds.
    pub async fn cleanup(&self) -> Result<()> {
        fs::remove_path(&self.root)
            .await
            .map(|_| ())
            .map_err(|source| Error::Workspace {
                path: self.root.clone(),
                source,
            })
    }
}
