//! Signing tool lookup.
//!
//! Search order: the `APKSIGNER` override, `apksigner` on `PATH`, then the
//! newest `build-tools/<version>/apksigner` under the Android SDK roots.

use super::ToolLocator;
use crate::BoxFuture;
use crate::error::Result;
use std::path::{Path, PathBuf};

#[cfg(windows)]
const APKSIGNER_FILE: &str = "apksigner.bat";
#[cfg(not(windows))]
const APKSIGNER_FILE: &str = "apksigner";

/// Locates `apksigner` on the host
#[derive(Debug, Clone, Default)]
pub struct ApkSignerLocator {
    override_path: Option<PathBuf>,
    search_path: bool,
    sdk_roots: Vec<PathBuf>,
}

impl ApkSignerLocator {
    /// Locator configured from `APKSIGNER`, `ANDROID_HOME` and `ANDROID_SDK_ROOT`
    pub fn from_env() -> Self {
        let sdk_roots = ["ANDROID_HOME", "ANDROID_SDK_ROOT"]
            .iter()
            .filter_map(|var| std::env::var_os(var))
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .collect();

        Self {
            override_path: std::env::var_os("APKSIGNER")
                .filter(|value| !value.is_empty())
                .map(PathBuf::from),
            search_path: true,
            sdk_roots,
        }
    }

    /// Locator that only scans the given SDK roots
    pub fn with_sdk_roots(sdk_roots: Vec<PathBuf>) -> Self {
        Self {
            override_path: None,
            search_path: false,
            sdk_roots,
        }
    }

    fn find(&self) -> Option<PathBuf> {
        if let Some(path) = &self.override_path {
            if path.is_file() {
                return Some(path.clone());
            }
            log::warn!("APKSIGNER points to {} which does not exist", path.display());
        }

        if self.search_path
            && let Ok(path) = which::which("apksigner")
        {
            log::debug!("Found apksigner on PATH at {}", path.display());
            return Some(path);
        }

        self.sdk_roots.iter().find_map(|root| newest_build_tools_signer(root))
    }
}

impl ToolLocator for ApkSignerLocator {
    fn locate<'a>(&'a self) -> BoxFuture<'a, Result<Option<PathBuf>>> {
        Box::pin(async move {
            let found = self.find();
            match &found {
                Some(path) => log::info!("Using apksigner at {}", path.display()),
                None => log::error!("apksigner not found"),
            }
            Ok(found)
        })
    }
}

/// Newest `build-tools/<version>/apksigner` below an SDK root
///
/// Directories whose names are not semantic versions are ignored.
fn newest_build_tools_signer(sdk_root: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(sdk_root.join("build-tools")).ok()?;

    entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let version = semver::Version::parse(entry.file_name().to_str()?).ok()?;
            let signer = entry.path().join(APKSIGNER_FILE);
            signer.is_file().then_some((version, signer))
        })
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, signer)| signer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn install(root: &Path, version: &str) -> PathBuf {
        let dir = root.join("build-tools").join(version);
        std::fs::create_dir_all(&dir).unwrap();
        let signer = dir.join(APKSIGNER_FILE);
        std::fs::write(&signer, "#!/bin/sh\n").unwrap();
        signer
    }

    #[tokio::test]
    async fn picks_newest_build_tools_version() {
        let sdk = tempfile::tempdir().unwrap();
        install(sdk.path(), "30.0.3");
        let newest = install(sdk.path(), "34.0.0");
        install(sdk.path(), "34.0.0-rc1");
        std::fs::create_dir_all(sdk.path().join("build-tools").join("not-a-version")).unwrap();

        let locator = ApkSignerLocator::with_sdk_roots(vec![sdk.path().to_path_buf()]);
        assert_eq!(locator.locate().await.unwrap(), Some(newest));
    }

    #[tokio::test]
    async fn version_directory_without_signer_is_skipped() {
        let sdk = tempfile::tempdir().unwrap();
        let older = install(sdk.path(), "33.0.1");
        std::fs::create_dir_all(sdk.path().join("build-tools").join("35.0.0")).unwrap();

        let locator = ApkSignerLocator::with_sdk_roots(vec![sdk.path().to_path_buf()]);
        assert_eq!(locator.locate().await.unwrap(), Some(older));
    }

    #[tokio::test]
    async fn empty_sdk_reports_unavailable() {
        let sdk = tempfile::tempdir().unwrap();
        let locator = ApkSignerLocator::with_sdk_roots(vec![sdk.path().to_path_buf()]);
        assert_eq!(locator.locate().await.unwrap(), None);
    }
}
