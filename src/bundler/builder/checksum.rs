//! SHA-256 fingerprints for archives and materialized trees.

use crate::bundler::{
    Result,
    error::{Error, ErrorExt},
    utils::fs::collect_files,
};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

const CHUNK_SIZE: usize = 8192;

/// Calculates the hex SHA-256 of a single file, reading it in 8KB chunks.
///
/// Blocking; the archiver calls it from its writer thread.
pub fn calculate_sha256(file_path: &Path) -> Result<String> {
    let mut file =
        std::fs::File::open(file_path).fs_context("opening file for hashing", file_path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let n = std::io::Read::read(&mut file, &mut buffer)
            .fs_context("reading file for hash calculation", file_path)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Calculates a digest of a directory tree.
///
/// Files are visited in sorted path order; for each, the `/`-joined path
/// relative to `root` and then the content are fed to the hasher. Two trees
/// with the same relative layout and contents have the same digest wherever
/// they live on disk.
pub async fn tree_digest(root: &Path) -> Result<String> {
    let files = {
        let root = root.to_path_buf();
        tokio::task::spawn_blocking(move || collect_files(&root))
            .await
            .map_err(|e| Error::GenericError(format!("directory walk panicked: {e}")))??
    };

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    for path in files {
        let name = crate::bundler::archive::entry_name(root, &path).map_err(Error::GenericError)?;
        hasher.update(name.as_bytes());
        hasher.update([0u8]);

        let mut file = tokio::fs::File::open(&path)
            .await
            .fs_context("opening file for hashing", &path)?;
        loop {
            let n = file
                .read(&mut buffer)
                .await
                .fs_context("reading file for hash calculation", &path)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_hash_matches_known_digest() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("abc.txt");
        std::fs::write(&path, "abc").unwrap();

        assert_eq!(
            calculate_sha256(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn missing_file_is_a_file_system_error() {
        let temp = tempfile::TempDir::new().unwrap();

        let error = calculate_sha256(&temp.path().join("missing")).unwrap_err();

        assert!(matches!(error, Error::Fs { .. }));
    }
}
