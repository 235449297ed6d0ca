//! File system utilities for bundling.
//!
//! Helpers used by the workspace manager, artifact selection and the
//! archiver. A missing path is never an error when removing or listing.

use crate::bundler::error::{ErrorExt, Result};
use std::{
    io,
    path::{Path, PathBuf},
};
use tokio::fs;

/// Removes whatever occupies `path`: a directory tree, a file or a symlink.
///
/// Symlinks are removed, never followed. Returns `Ok(false)` if nothing was
/// there.
pub async fn remove_path(path: &Path) -> io::Result<bool> {
    let metadata = match fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    let result = if metadata.is_dir() {
        fs::remove_dir_all(path).await
    } else {
        fs::remove_file(path).await
    };

    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false), // Idempotent
        Err(e) => Err(e),
    }
}

/// Returns the sorted file names directly inside `dir`.
///
/// A missing directory yields an empty list.
pub async fn list_file_names(dir: &Path) -> Result<Vec<String>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).fs_context("reading directory", dir),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .fs_context("reading directory entry", dir)?
    {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

/// Collects every regular file below `root`, sorted by path.
///
/// Symlinks are not followed. Blocking; call from `spawn_blocking`.
pub fn collect_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            crate::bundler::Error::Fs {
                context: "walking directory",
                path,
                error: e.into(),
            }
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
