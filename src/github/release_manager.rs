//! GitHub release publishing for signed packages

use super::client::{GitHubClient, NewRelease, Release};
use crate::BoxFuture;
use crate::error::{PublishError, Result};
use crate::publish::{PublishRequest, Publisher, file_name};
use crate::utils::http;

/// Configuration for GitHub releases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubReleaseConfig {
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub repo: String,
}

impl GitHubReleaseConfig {
    /// Parse `owner/repo`
    pub fn from_repository(repository: &str) -> Option<Self> {
        let (owner, repo) = repository.trim().split_once('/')?;
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return None;
        }
        Some(Self {
            owner: owner.to_string(),
            repo: repo.trim_end_matches(".git").to_string(),
        })
    }
}

/// Publishes each build as a GitHub release with the package attached
#[derive(Debug, Clone)]
pub struct GitHubPublisher {
    client: GitHubClient,
    config: GitHubReleaseConfig,
}

impl GitHubPublisher {
    /// Publisher for `config` using `client`
    pub fn new(client: GitHubClient, config: GitHubReleaseConfig) -> Self {
        Self { client, config }
    }

    /// Configure from `GITHUB_TOKEN` (or `GH_TOKEN`) and `GITHUB_REPOSITORY`
    pub fn from_env() -> Result<Self> {
        let client = GitHubClient::from_env()?;
        if !client.is_authenticated() {
            return Err(PublishError::MissingEnvironment {
                variable: "GITHUB_TOKEN",
            }
            .into());
        }

        let config = std::env::var("GITHUB_REPOSITORY")
            .ok()
            .and_then(|value| GitHubReleaseConfig::from_repository(&value))
            .ok_or(PublishError::MissingEnvironment {
                variable: "GITHUB_REPOSITORY",
            })?;

        Ok(Self::new(client, config))
    }

    async fn release_for(&self, request: &PublishRequest<'_>) -> Result<Release> {
        let tag = request.tag();
        if let Some(existing) = self
            .client
            .release_by_tag(&self.config.owner, &self.config.repo, &tag)
            .await?
        {
            log::info!("Release {tag} already exists; attaching to it");
            return Ok(existing);
        }

        let checksum = http::sha256_file(&request.artifact.path).await?;
        let release = NewRelease {
            tag_name: tag.clone(),
            name: format!("{} {} v{}", request.app, request.name, request.artifact.version),
            body: release_body(request, &checksum),
            prerelease: false,
        };
        self.client
            .create_release(&self.config.owner, &self.config.repo, &release)
            .await
    }

    async fn publish_release(&self, request: &PublishRequest<'_>) -> Result<()> {
        let (owner, repo) = (&self.config.owner, &self.config.repo);
        let release = self.release_for(request).await?;

        // Uploads of a name the release already has are rejected by GitHub
        let name = file_name(&request.artifact.path);
        let assets = release
            .assets
            .iter()
            .map(|asset| (asset.id.into_inner(), asset.name.as_str()));
        if let Some(stale) = colliding_asset(assets, &name) {
            log::info!("Replacing existing asset {name} on {}", release.tag_name);
            self.client.delete_asset(owner, repo, stale).await?;
        }

        self.client
            .upload_asset(owner, repo, &release, &request.artifact.path)
            .await?;
        log::info!("Published {}", release.html_url);
        Ok(())
    }
}

/// Id of the `(id, name)` asset an upload named `name` would collide with
fn colliding_asset<'a>(assets: impl IntoIterator<Item = (u64, &'a str)>, name: &str) -> Option<u64> {
    assets
        .into_iter()
        .find(|(_, existing)| *existing == name)
        .map(|(id, _)| id)
}

impl Publisher for GitHubPublisher {
    fn publish<'a>(&'a self, request: &'a PublishRequest<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.publish_release(request))
    }
}

fn release_body(request: &PublishRequest<'_>, checksum: &str) -> String {
    format!(
        "Patched {} {} built with {}.\n\n\
         | | |\n|---|---|\n\
         | Patches | `{}` |\n\
         | Patcher | `{}` |\n\
         | SHA-256 | `{}` |\n",
        request.app,
        request.artifact.version,
        request.name,
        file_name(request.patch_bundle),
        file_name(request.patcher),
        checksum,
    )
}
