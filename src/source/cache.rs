//! Packages already present in the downloads directory.

use super::versions::{VersionNegotiator, compare_versions};
use super::{Download, PACKAGE_EXTENSIONS, ResolveRequest, SourceProvider};
use crate::BoxFuture;
use crate::error::Result;
use crate::utils::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Reuses `<downloads>/<app>-<version>.<ext>` from an earlier run
#[derive(Debug)]
pub struct CacheProvider {
    downloads_dir: PathBuf,
    versions: Arc<VersionNegotiator>,
}

impl CacheProvider {
    /// Provider looking in `downloads_dir`
    pub fn new(downloads_dir: impl Into<PathBuf>, versions: Arc<VersionNegotiator>) -> Self {
        Self {
            downloads_dir: downloads_dir.into(),
            versions,
        }
    }

    async fn find(&self, request: &ResolveRequest) -> Result<Option<Download>> {
        let version = self
            .versions
            .version(&request.patcher, &request.patch_bundle)
            .await?;

        match version {
            Some(version) => {
                for ext in PACKAGE_EXTENSIONS {
                    let path = self.downloads_dir.join(format!("{}-{version}.{ext}", request.app));
                    if fs::is_file(&path).await {
                        return Ok(Some(Download::new(path, version)));
                    }
                }
                Ok(None)
            }
            None => Ok(newest_cached(&self.downloads_dir, &request.app)),
        }
    }
}

impl SourceProvider for CacheProvider {
    fn name(&self) -> &str {
        "cache"
    }

    fn attempt<'a>(&'a self, request: &'a ResolveRequest) -> BoxFuture<'a, Result<Option<Download>>> {
        Box::pin(self.find(request))
    }
}

/// Highest-versioned cached package of `app` when no version is known
fn newest_cached(downloads_dir: &Path, app: &str) -> Option<Download> {
    let prefix = format!("{app}-");
    let pattern = downloads_dir.join(format!("{}*", glob::Pattern::escape(&prefix)));
    let entries = glob::glob(&pattern.to_string_lossy()).ok()?;

    entries
        .filter_map(|entry| entry.ok())
        .filter_map(|path| {
            let ext = path.extension()?.to_str()?.to_ascii_lowercase();
            if !PACKAGE_EXTENSIONS.contains(&ext.as_str()) {
                return None;
            }
            let version = path.file_stem()?.to_str()?.strip_prefix(&prefix)?.to_string();
            version
                .starts_with(|c: char| c.is_ascii_digit())
                .then(|| Download::new(path.clone(), version))
        })
        .max_by(|a, b| compare_versions(&a.version, &b.version))
}
