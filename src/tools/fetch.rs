//! Download of patcher tooling and the APKEditor merge tool.
//!
//! Release assets are cached under the tools directory. An asset already on
//! disk with the size GitHub reports is reused without a request.

use super::ToolLocator;
use crate::BoxFuture;
use crate::error::{ConfigError, Result};
use crate::github::{GitHubClient, Release, ReleaseSelector};
use crate::profile::{RepositoryRef, SourceProfile};
use crate::utils::fs;
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;

const APKEDITOR_OWNER: &str = "REAndroid";
const APKEDITOR_REPO: &str = "APKEditor";
const APKEDITOR_ASSET: &str = "APKEditor*.jar";

/// Patcher tooling of one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tooling {
    /// Display name of the patch distribution
    pub name: String,
    /// Patcher CLI jar
    pub patcher: PathBuf,
    /// Patch bundle (`.rvp`)
    pub patch_bundle: PathBuf,
}

impl Tooling {
    /// Pick the patcher and patch bundle out of `files`
    pub fn from_files(name: impl Into<String>, files: &[PathBuf]) -> Result<Self> {
        let patcher = find_file(files, "cli", "jar").ok_or_else(|| ConfigError::MissingTool {
            description: "patcher .jar".to_string(),
        })?;
        let patch_bundle = find_file(files, "patches", "rvp").ok_or_else(|| ConfigError::MissingTool {
            description: "patches .rvp".to_string(),
        })?;

        Ok(Self {
            name: name.into(),
            patcher,
            patch_bundle,
        })
    }
}

/// First file whose name contains `contains` and has extension `ext`
pub fn find_file(files: &[PathBuf], contains: &str, ext: &str) -> Option<PathBuf> {
    files
        .iter()
        .find(|path| {
            let name_matches = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.to_ascii_lowercase().contains(contains));
            let ext_matches = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(ext));
            name_matches && ext_matches
        })
        .cloned()
}

/// Downloads the tooling a source profile lists
#[derive(Debug, Clone)]
pub struct ToolFetcher {
    client: GitHubClient,
    tools_dir: PathBuf,
}

impl ToolFetcher {
    /// Fetcher caching into `tools_dir`
    pub fn new(client: GitHubClient, tools_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            tools_dir: tools_dir.into(),
        }
    }

    /// Download every repository's matching assets and pick the tooling
    pub async fn fetch_required(&self, profile: &SourceProfile) -> Result<Tooling> {
        fs::create_dir_all(&self.tools_dir).await?;

        let mut files = Vec::new();
        for repository in &profile.repositories {
            files.extend(self.fetch_repository(repository).await?);
        }

        let tooling = Tooling::from_files(&profile.name, &files)?;
        log::info!(
            "Using patcher {} with patches {}",
            tooling.patcher.display(),
            tooling.patch_bundle.display()
        );
        Ok(tooling)
    }

    async fn fetch_repository(&self, repository: &RepositoryRef) -> Result<Vec<PathBuf>> {
        let selector = ReleaseSelector::parse(&repository.tag);
        let release = self
            .client
            .release(&repository.owner, &repository.repo, &selector)
            .await?;
        log::info!(
            "{}/{}: release {}",
            repository.owner,
            repository.repo,
            release.tag_name
        );

        let patterns = compile_patterns(&repository.assets)?;
        download_matching(&self.client, &release, &patterns, &self.tools_dir).await
    }
}

/// Locates APKEditor, downloading the latest release on first use
#[derive(Debug)]
pub struct ApkEditorFetcher {
    client: GitHubClient,
    tools_dir: PathBuf,
    jar: OnceCell<Option<PathBuf>>,
}

impl ApkEditorFetcher {
    /// Fetcher caching into `tools_dir`
    pub fn new(client: GitHubClient, tools_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            tools_dir: tools_dir.into(),
            jar: OnceCell::new(),
        }
    }

    async fn fetch(&self) -> Result<Option<PathBuf>> {
        fs::create_dir_all(&self.tools_dir).await?;

        let release = self
            .client
            .release(APKEDITOR_OWNER, APKEDITOR_REPO, &ReleaseSelector::Latest)
            .await?;
        let patterns = compile_patterns(&[APKEDITOR_ASSET.to_string()])?;
        let files = download_matching(&self.client, &release, &patterns, &self.tools_dir).await?;
        Ok(files.into_iter().next())
    }
}

impl ToolLocator for ApkEditorFetcher {
    fn locate<'a>(&'a self) -> BoxFuture<'a, Result<Option<PathBuf>>> {
        Box::pin(async move {
            let jar = self.jar.get_or_try_init(|| self.fetch()).await?;
            if jar.is_none() {
                log::warn!("{APKEDITOR_OWNER}/{APKEDITOR_REPO} latest release has no {APKEDITOR_ASSET} asset");
            }
            Ok(jar.clone())
        })
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<glob::Pattern>> {
    patterns
        .iter()
        .map(|p| {
            glob::Pattern::new(p)
                .map_err(|e| crate::BuildError::Generic(format!("invalid asset pattern '{p}': {e}")))
        })
        .collect()
}

async fn download_matching(
    client: &GitHubClient,
    release: &Release,
    patterns: &[glob::Pattern],
    tools_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for asset in &release.assets {
        if !patterns.iter().any(|p| p.matches(&asset.name)) {
            continue;
        }

        let dest = tools_dir.join(&asset.name);
        let expected_size = u64::try_from(asset.size).unwrap_or(0);
        if is_cached(&dest, expected_size).await {
            log::debug!("{} already cached at {}", asset.name, dest.display());
        } else {
            log::info!("Downloading {}...", asset.name);
            client.download_asset(asset, &dest).await?;
        }
        files.push(dest);
    }
    Ok(files)
}

async fn is_cached(path: &Path, expected_size: u64) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(meta) => meta.is_file() && (expected_size == 0 || meta.len() == expected_size),
        Err(_) => false,
    }
}
