//! GitHub client for release lookup, creation and asset transfer.
//!
//! Release API calls go through octocrab; asset downloads are plain HTTP
//! requests against `browser_download_url`.

use crate::BuildError;
use crate::error::{ErrorExt, Result};
use crate::utils::http;
use bytes::Bytes;
use octocrab::Octocrab;
use std::path::Path;
use std::sync::OnceLock;

pub use octocrab::models::repos::{Asset, Release};

/// Ensures the rustls crypto provider is installed once per process
static RUSTLS_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Which release of a repository to use
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseSelector {
    /// Latest non-prerelease release
    Latest,
    /// Most recent release including prereleases
    Prerelease,
    /// Release with an exact tag
    Tag(String),
}

impl ReleaseSelector {
    /// Parse the `tag` field of a source profile entry
    pub fn parse(tag: &str) -> Self {
        match tag.trim() {
            "" | "latest" => Self::Latest,
            "prerelease" | "dev" => Self::Prerelease,
            other => Self::Tag(other.to_string()),
        }
    }
}

/// Options for a new release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRelease {
    /// Tag to create
    pub tag_name: String,
    /// Display name
    pub name: String,
    /// Markdown body
    pub body: String,
    /// Mark as prerelease
    pub prerelease: bool,
}

/// GitHub client
#[derive(Clone)]
pub struct GitHubClient {
    api: Octocrab,
    http: reqwest::Client,
    authenticated: bool,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("authenticated", &self.authenticated)
            .finish_non_exhaustive()
    }
}

impl GitHubClient {
    /// Create a client, optionally authenticated with `token`
    pub fn new(token: Option<String>) -> Result<Self> {
        RUSTLS_INITIALIZED.get_or_init(|| {
            // Err means another provider was installed first, which is fine
            let _ = rustls::crypto::ring::default_provider().install_default();
        });

        let authenticated = token.is_some();
        let mut builder = Octocrab::builder();
        if let Some(token) = token {
            builder = builder.personal_token(token);
        }
        let api = builder.build().map_err(api_error("client initialization"))?;

        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            api,
            http,
            authenticated,
        })
    }

    /// Create a client from `GH_TOKEN` or `GITHUB_TOKEN` (anonymous if neither is set)
    pub fn from_env() -> Result<Self> {
        let token = ["GH_TOKEN", "GITHUB_TOKEN"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|value| !value.trim().is_empty());
        Self::new(token)
    }

    /// Whether requests carry a token
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// HTTP client for plain downloads (shared connection pool)
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Fetch the release selected by `selector`
    pub async fn release(&self, owner: &str, repo: &str, selector: &ReleaseSelector) -> Result<Release> {
        let repo_handler = self.api.repos(owner, repo);
        let releases = repo_handler.releases();
        match selector {
            ReleaseSelector::Latest => releases.get_latest().await.map_err(api_error("get latest release")),
            ReleaseSelector::Prerelease => releases
                .list()
                .per_page(10)
                .send()
                .await
                .map_err(api_error("list releases"))?
                .items
                .into_iter()
                .next()
                .ok_or_else(|| BuildError::Generic(format!("{owner}/{repo} has no releases"))),
            ReleaseSelector::Tag(tag) => self
                .release_by_tag(owner, repo, tag)
                .await?
                .ok_or_else(|| BuildError::Generic(format!("{owner}/{repo} has no release tagged {tag}"))),
        }
    }

    /// Release with tag `tag`, `None` if it does not exist
    pub async fn release_by_tag(&self, owner: &str, repo: &str, tag: &str) -> Result<Option<Release>> {
        match self.api.repos(owner, repo).releases().get_by_tag(tag).await {
            Ok(release) => Ok(Some(release)),
            Err(octocrab::Error::GitHub { source, .. }) if source.status_code.as_u16() == 404 => Ok(None),
            Err(e) => Err(api_error("get release by tag")(e)),
        }
    }

    /// Create a release
    pub async fn create_release(&self, owner: &str, repo: &str, release: &NewRelease) -> Result<Release> {
        self.api
            .repos(owner, repo)
            .releases()
            .create(&release.tag_name)
            .name(&release.name)
            .body(&release.body)
            .draft(false)
            .prerelease(release.prerelease)
            .send()
            .await
            .map_err(api_error("create release"))
    }

    /// Upload `path` as an asset of `release`
    pub async fn upload_asset(&self, owner: &str, repo: &str, release: &Release, path: &Path) -> Result<Asset> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| BuildError::Generic(format!("invalid asset path {}", path.display())))?;

        let data = tokio::fs::read(path).await.fs_context("reading release asset", path)?;
        log::info!("Uploading {} ({} bytes) to {}", file_name, data.len(), release.html_url);

        self.api
            .repos(owner, repo)
            .releases()
            .upload_asset(release.id.into_inner(), file_name, Bytes::from(data))
            .send()
            .await
            .map_err(api_error("upload asset"))
    }

    /// Delete a release asset
    pub async fn delete_asset(&self, owner: &str, repo: &str, asset_id: u64) -> Result<()> {
        self.api
            .repos(owner, repo)
            .release_assets()
            .delete(asset_id)
            .await
            .map_err(api_error("delete asset"))
    }

    /// Download a release asset to `dest`
    pub async fn download_asset(&self, asset: &Asset, dest: &Path) -> Result<u64> {
        let response = self
            .http
            .get(asset.browser_download_url.clone())
            .header(reqwest::header::ACCEPT, "application/octet-stream")
            .send()
            .await?
            .error_for_status()?;
        http::write_response(response, dest).await
    }
}

fn api_error(operation: &'static str) -> impl FnOnce(octocrab::Error) -> BuildError {
    move |error| BuildError::GitHub {
        operation,
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_parses_profile_tags() {
        assert_eq!(ReleaseSelector::parse("latest"), ReleaseSelector::Latest);
        assert_eq!(ReleaseSelector::parse(""), ReleaseSelector::Latest);
        assert_eq!(ReleaseSelector::parse("prerelease"), ReleaseSelector::Prerelease);
        assert_eq!(
            ReleaseSelector::parse("v5.0.1"),
            ReleaseSelector::Tag("v5.0.1".to_string())
        );
    }

    #[tokio::test]
    async fn anonymous_client_is_not_authenticated() {
        assert!(!GitHubClient::new(None).unwrap().is_authenticated());
        assert!(GitHubClient::new(Some("token".to_string())).unwrap().is_authenticated());
    }

    #[test]
    fn api_errors_name_the_operation() {
        let err = BuildError::GitHub {
            operation: "create release",
            message: "Validation Failed".to_string(),
        };
        assert_eq!(err.to_string(), "GitHub API create release failed: Validation Failed");
    }
}
