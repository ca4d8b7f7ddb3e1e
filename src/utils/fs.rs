//! File system helpers for artifact hand-over between pipeline stages.

use crate::error::{ErrorExt, Result};
use std::io;
use std::path::Path;
use tokio::fs;

/// Remove a file, treating an already-missing file as success.
pub async fn remove_file(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => {
            log::debug!("Removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).fs_context("removing artifact", path),
    }
}

/// Creates all of the directories of the specified path.
pub async fn create_dir_all(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .await
        .fs_context("creating directory", path)
}

/// Whether `path` exists as a regular file.
pub async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn remove_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        remove_file(&dir.path().join("never-existed.apk")).await.unwrap();
    }

    #[tokio::test]
    async fn remove_existing_file_deletes_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.apkm");
        std::fs::write(&path, b"bundle").unwrap();

        assert!(is_file(&path).await);
        remove_file(&path).await.unwrap();
        assert!(!is_file(&path).await);
    }
}
