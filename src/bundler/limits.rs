//! Optional platform limit check for finished archives.
//!
//! Function platforms cap layer size both zipped and unzipped. The check
//! runs on a finished archive, outside the pipeline, and only reports: it
//! never deletes or changes the archive.

use crate::bundler::error::{ErrorExt, Result};
use std::{fs::File, io::BufReader, path::Path};

const MIB: u64 = 1024 * 1024;

/// Size limits for a layer archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct LayerLimits {
    /// Maximum archive size in bytes.
    pub max_zipped_bytes: u64,
    /// Maximum total size of the extracted files in bytes.
    pub max_unzipped_bytes: u64,
}

impl Default for LayerLimits {
    /// Documented per-layer limits of common function platforms:
    /// 50 MiB zipped, 250 MiB unzipped.
    fn default() -> Self {
        Self {
            max_zipped_bytes: 50 * MIB,
            max_unzipped_bytes: 250 * MIB,
        }
    }
}

/// Sizes measured from an archive and the limits they exceed.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LimitReport {
    /// Archive file size
    pub zipped_bytes: u64,
    /// Sum of uncompressed entry sizes
    pub unzipped_bytes: u64,
    /// Number of entries
    pub entries: usize,
    /// Human-readable violations; empty if within limits
    pub violations: Vec<String>,
}

impl LimitReport {
    /// Returns true if no limit is exceeded.
    pub fn is_within_limits(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Measures `archive` against `limits`.
///
/// Reads only the zip central directory.
pub async fn check_archive(archive: &Path, limits: LayerLimits) -> Result<LimitReport> {
    let path = archive.to_path_buf();
    tokio::task::spawn_blocking(move || measure(&path, limits))
        .await
        .map_err(|e| crate::bundler::Error::GenericError(format!("limit check panicked: {e}")))?
}

fn measure(archive: &Path, limits: LayerLimits) -> Result<LimitReport> {
    let file = File::open(archive).fs_context("opening archive", archive)?;
    let zipped_bytes = file
        .metadata()
        .fs_context("reading archive metadata", archive)?
        .len();

    let mut zip = zip::ZipArchive::new(BufReader::new(file))?;
    let mut unzipped_bytes = 0u64;
    for index in 0..zip.len() {
        let entry = zip.by_index_raw(index)?;
        unzipped_bytes = unzipped_bytes.saturating_add(entry.size());
    }

    let mut violations = Vec::new();
    if zipped_bytes > limits.max_zipped_bytes {
        violations.push(format!(
            "archive is {} bytes, limit is {} bytes",
            zipped_bytes, limits.max_zipped_bytes
        ));
    }
    if unzipped_bytes > limits.max_unzipped_bytes {
        violations.push(format!(
            "extracted size is {} bytes, limit is {} bytes",
            unzipped_bytes, limits.max_unzipped_bytes
        ));
    }

    for violation in &violations {
        log::warn!("{}: {}", archive.display(), violation);
    }

    Ok(LimitReport {
        zipped_bytes,
        unzipped_bytes,
        entries: zip.len(),
        violations,
    })
}
