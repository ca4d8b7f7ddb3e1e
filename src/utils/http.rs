//! HTTP utilities for downloading packages and tools.
//!
//! Provides streaming downloads to disk and SHA-256 checksums of the
//! artifacts the build produces.

use crate::error::{ErrorExt, Result};
use sha2::Digest as _;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Stream a response body into `dest`.
///
/// The body is written to a `.part` sibling first and renamed on completion,
/// so an interrupted download never leaves a truncated file at `dest`.
/// Returns the number of bytes written.
pub async fn write_response(mut response: reqwest::Response, dest: &Path) -> Result<u64> {
    if let Some(parent) = dest.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .fs_context("creating download directory", parent)?;
    }

    let partial = partial_path(dest);
    let mut file = tokio::fs::File::create(&partial)
        .await
        .fs_context("creating download file", &partial)?;

    let mut written = 0u64;
    let outcome: Result<()> = async {
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await.fs_context("writing download", &partial)?;
            written += chunk.len() as u64;
        }
        file.flush().await.fs_context("flushing download", &partial)?;
        Ok(())
    }
    .await;

    if let Err(error) = outcome {
        drop(file);
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(error);
    }

    tokio::fs::rename(&partial, dest)
        .await
        .fs_context("moving download into place", dest)?;

    log::debug!("Downloaded {} bytes to {}", written, dest.display());
    Ok(written)
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

/// SHA-256 of a file as lowercase hex.
///
/// Uses spawn_blocking to keep CPU-bound hashing off the async runtime.
pub async fn sha256_file(path: &Path) -> Result<String> {
    let data = tokio::fs::read(path).await.fs_context("reading file for checksum", path)?;

    let digest = tokio::task::spawn_blocking(move || {
        let mut hasher = sha2::Sha256::new();
        hasher.update(&data);
        hex::encode(hasher.finalize())
    })
    .await?;

    Ok(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_path_appends_suffix() {
        assert_eq!(
            partial_path(Path::new("downloads/demo-1.2.3.apk")),
            PathBuf::from("downloads/demo-1.2.3.apk.part")
        );
    }

    #[tokio::test]
    async fn sha256_matches_known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        std::fs::write(&path, "abc").unwrap();

        assert_eq!(
            sha256_file(&path).await.unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
