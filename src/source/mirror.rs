//! Download mirrors listed in the app profile.

use super::versions::VersionNegotiator;
use super::{Download, ResolveRequest, SourceProvider};
use crate::BoxFuture;
use crate::BuildError;
use crate::error::Result;
use crate::profile::MirrorEntry;
use crate::utils::http;
use std::path::PathBuf;
use std::sync::Arc;

const VERSION_PLACEHOLDER: &str = "{version}";

/// Downloads a package from a URL template
///
/// Network failures and error statuses mean "not found here" and hand over
/// to the next provider.
#[derive(Debug)]
pub struct MirrorProvider {
    entry: MirrorEntry,
    downloads_dir: PathBuf,
    http: reqwest::Client,
    versions: Arc<VersionNegotiator>,
}

impl MirrorProvider {
    /// Provider for one mirror entry
    pub fn new(
        entry: MirrorEntry,
        downloads_dir: impl Into<PathBuf>,
        http: reqwest::Client,
        versions: Arc<VersionNegotiator>,
    ) -> Self {
        Self {
            entry,
            downloads_dir: downloads_dir.into(),
            http,
            versions,
        }
    }

    async fn fetch(&self, request: &ResolveRequest) -> Result<Option<Download>> {
        let version = self
            .versions
            .version(&request.patcher, &request.patch_bundle)
            .await?;

        let templated = self.entry.url.contains(VERSION_PLACEHOLDER);
        let version = match version {
            Some(v) => v,
            None if templated => {
                log::warn!("{}: no version known to fill the URL template", self.entry.name);
                return Ok(None);
            }
            None => "latest".to_string(),
        };

        let url = url::Url::parse(&self.entry.url.replace(VERSION_PLACEHOLDER, &version))?;
        let ext = self
            .entry
            .extension
            .clone()
            .or_else(|| extension_of(&url))
            .unwrap_or_else(|| "apk".to_string());
        let dest = self
            .downloads_dir
            .join(format!("{}-{version}.{ext}", request.app));

        log::info!("{}: downloading {}", self.entry.name, url);
        let response = match self.http.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                log::warn!("{}: request failed: {e}", self.entry.name);
                return Ok(None);
            }
        };
        if !response.status().is_success() {
            log::warn!("{}: {} returned {}", self.entry.name, url, response.status());
            return Ok(None);
        }

        match http::write_response(response, &dest).await {
            Ok(bytes) => {
                log::debug!("{}: saved {bytes} bytes", self.entry.name);
                Ok(Some(Download::new(dest, version)))
            }
            Err(BuildError::Http(e)) => {
                log::warn!("{}: download interrupted: {e}", self.entry.name);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

impl SourceProvider for MirrorProvider {
    fn name(&self) -> &str {
        &self.entry.name
    }

    fn attempt<'a>(&'a self, request: &'a ResolveRequest) -> BoxFuture<'a, Result<Option<Download>>> {
        Box::pin(self.fetch(request))
    }
}

/// Package extension of the last URL path segment, if it names one
fn extension_of(url: &url::Url) -> Option<String> {
    let segment = url.path_segments()?.next_back()?;
    let (_, ext) = segment.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    super::PACKAGE_EXTENSIONS
        .contains(&ext.as_str())
        .then_some(ext)
}
