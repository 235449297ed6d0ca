//! Layer archive writer.
//!
//! Entry names are the file paths relative to the archive root, joined with
//! `/`. The workspace location never shows up inside the archive, so the same
//! tree produces the same entry list wherever it was staged. Entries are
//! written in sorted order with a fixed timestamp.
//!
//! The zip is written and hashed as a hidden partial file on a blocking
//! thread. Only the completed future renames it into place, so dropping
//! [`archive_directory`] (for example on a stage timeout) never leaves an
//! archive or a partial file behind.

use crate::bundler::{
    builder::checksum::calculate_sha256,
    error::{Error, Result},
    utils::fs::collect_files,
};
use std::{
    fs::File,
    io::{self, BufWriter, Read, Write},
    path::{Component, Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

const COPY_CHUNK: usize = 64 * 1024;

/// A finished archive.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ArchiveSummary {
    /// Archive path
    pub path: PathBuf,
    /// Number of file entries
    pub files: usize,
    /// Archive size in bytes
    pub bytes: u64,
    /// Hex SHA-256 of the archive file
    pub sha256: String,
}

/// Archives every regular file below `root` into `output`.
///
/// The archive is first written to a hidden sibling of `output` and renamed
/// into place once complete, so `output` either holds a finished archive or
/// is left alone. Nothing is awaited after the rename.
///
/// # Errors
///
/// [`Error::Archive`] if `root` contains no files, if a path cannot be
/// represented in the archive, or on any write failure.
pub async fn archive_directory(root: &Path, output: &Path) -> Result<ArchiveSummary> {
    log::info!(
        "Archiving {} into {}",
        root.display(),
        output.display()
    );

    let archive_error = |reason: String| Error::Archive {
        path: output.to_path_buf(),
        reason,
    };

    let files = {
        let root = root.to_path_buf();
        tokio::task::spawn_blocking(move || collect_files(&root))
            .await
            .map_err(|e| archive_error(format!("directory walk panicked: {e}")))?
            .map_err(|e| archive_error(e.to_string()))?
    };

    if files.is_empty() {
        return Err(archive_error(format!(
            "{} contains no files; the install step produced nothing to package",
            root.display()
        )));
    }

    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| archive_error(format!("creating {}: {e}", parent.display())))?;
    }

    let mut partial = PartialArchive::new(partial_path(output));
    let written = {
        let root = root.to_path_buf();
        let path = partial.path.clone();
        let cancelled = Arc::clone(&partial.cancelled);
        tokio::task::spawn_blocking(move || write_archive(&root, &files, &path, &cancelled))
            .await
            .map_err(|e| archive_error(format!("archive writer panicked: {e}")))?
            .map_err(archive_error)?
    };

    std::fs::rename(&partial.path, output).map_err(|e| {
        archive_error(format!("moving {} into place: {e}", partial.path.display()))
    })?;
    partial.persisted();

    log::info!(
        "✓ Created {} ({} files, {} bytes)",
        output.display(),
        written.files,
        written.bytes
    );

    Ok(ArchiveSummary {
        path: output.to_path_buf(),
        files: written.files,
        bytes: written.bytes,
        sha256: written.sha256,
    })
}

/// Returns the archive entry name for `path` below `root`.
///
/// Fails for paths outside `root` and for names that are not valid UTF-8.
pub fn entry_name(root: &Path, path: &Path) -> std::result::Result<String, String> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| format!("{} is outside {}", path.display(), root.display()))?;

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(
                part.to_str()
                    .ok_or_else(|| format!("{} is not valid UTF-8", path.display()))?,
            ),
            Component::CurDir => {}
            _ => return Err(format!("{} cannot be archived", path.display())),
        }
    }

    if parts.is_empty() {
        return Err(format!("{} has no name inside the archive", path.display()));
    }
    Ok(parts.join("/"))
}

fn partial_path(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "layer.zip".to_string());
    output.with_file_name(format!(".{}.{}.partial", name, uuid::Uuid::new_v4()))
}

/// The hidden file an archive is written to before the rename.
///
/// Dropping it before [`persisted`](Self::persisted) tells the writer thread
/// to stop and removes the file.
struct PartialArchive {
    path: PathBuf,
    cancelled: Arc<AtomicBool>,
    persisted: bool,
}

impl PartialArchive {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            cancelled: Arc::new(AtomicBool::new(false)),
            persisted: false,
        }
    }

    fn persisted(&mut self) {
        self.persisted = true;
    }
}

impl Drop for PartialArchive {
    fn drop(&mut self) {
        if self.persisted {
            return;
        }
        self.cancelled.store(true, Ordering::SeqCst);
        remove_partial(&self.path);
    }
}

fn remove_partial(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => log::debug!("Removed partial archive {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => log::warn!(
            "Failed to remove partial archive {}: {}",
            path.display(),
            e
        ),
    }
}

struct Written {
    files: usize,
    bytes: u64,
    sha256: String,
}

/// Writes and hashes the partial archive. Removes it again on failure or
/// cancellation.
fn write_archive(
    root: &Path,
    files: &[PathBuf],
    destination: &Path,
    cancelled: &AtomicBool,
) -> std::result::Result<Written, String> {
    let result = write_zip(root, files, destination, cancelled).and_then(|count| {
        let bytes = std::fs::metadata(destination)
            .map_err(|e| format!("reading archive metadata: {e}"))?
            .len();
        let sha256 = calculate_sha256(destination).map_err(|e| e.to_string())?;
        if cancelled.load(Ordering::SeqCst) {
            return Err("archive write cancelled".to_string());
        }
        Ok(Written {
            files: count,
            bytes,
            sha256,
        })
    });

    if result.is_err() {
        remove_partial(destination);
    }
    result
}

fn write_zip(
    root: &Path,
    files: &[PathBuf],
    destination: &Path,
    cancelled: &AtomicBool,
) -> std::result::Result<usize, String> {
    let file = File::create(destination)
        .map_err(|e| format!("creating {}: {e}", destination.display()))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));

    let base_options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());
    let mut buffer = vec![0u8; COPY_CHUNK];

    for path in files {
        let name = entry_name(root, path)?;
        let options = with_permissions(base_options, path)?;

        zip.start_file(name.as_str(), options)
            .map_err(|e| format!("adding {name}: {e}"))?;
        let mut source =
            File::open(path).map_err(|e| format!("opening {}: {e}", path.display()))?;
        loop {
            if cancelled.load(Ordering::SeqCst) {
                return Err("archive write cancelled".to_string());
            }
            let n = source
                .read(&mut buffer)
                .map_err(|e| format!("reading {}: {e}", path.display()))?;
            if n == 0 {
                break;
            }
            zip.write_all(&buffer[..n])
                .map_err(|e| format!("writing {name}: {e}"))?;
        }
    }

    let mut writer = zip
        .finish()
        .map_err(|e| format!("finalizing archive: {e}"))?;
    writer
        .flush()
        .map_err(|e| format!("flushing archive: {e}"))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| format!("syncing archive: {e}"))?;

    Ok(files.len())
}

#[cfg(unix)]
fn with_permissions(
    options: SimpleFileOptions,
    path: &Path,
) -> std::result::Result<SimpleFileOptions, String> {
    use std::os::unix::fs::PermissionsExt;

    let mode = std::fs::metadata(path)
        .map_err(|e| format!("reading {}: {e}", path.display()))?
        .permissions()
        .mode();
    Ok(options.unix_permissions(mode & 0o777))
}

#[cfg(not(unix))]
fn with_permissions(
    options: SimpleFileOptions,
    _path: &Path,
) -> std::result::Result<SimpleFileOptions, String> {
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_names_are_relative_and_slash_separated() {
        let root = Path::new("/tmp/ws/target");
        let file = root.join("mylib").join("sub").join("mod.py");

        assert_eq!(entry_name(root, &file).as_deref(), Ok("mylib/sub/mod.py"));
    }

    #[test]
    fn entry_names_reject_paths_outside_root() {
        let root = Path::new("/tmp/ws/target");
        assert!(entry_name(root, Path::new("/etc/passwd")).is_err());
        assert!(entry_name(root, root).is_err());
    }

    #[test]
    fn partial_file_is_hidden_sibling() {
        let partial = partial_path(Path::new("/out/mylib-layer.zip"));

        assert_eq!(partial.parent(), Some(Path::new("/out")));
        let name = partial.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        assert!(name.starts_with(".mylib-layer.zip."));
        assert!(name.ends_with(".partial"));
    }
}
