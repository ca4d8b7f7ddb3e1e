//! Source and app profiles.
//!
//! A *source profile* (`sources/<source>.json`) names the patch distribution
//! and the GitHub repositories its patcher and patch bundle are released
//! from:
//!
//! ```json
//! [
//!   { "name": "revanced" },
//!   { "user": "revanced", "repo": "revanced-cli", "tag": "latest" },
//!   { "user": "revanced", "repo": "revanced-patches", "tag": "latest" }
//! ]
//! ```
//!
//! An *app profile* (`apps/<app>.json`) names the Android package and the
//! mirrors to download it from, in preference order:
//!
//! ```json
//! {
//!   "package": "com.google.android.youtube",
//!   "mirrors": [
//!     { "name": "apkmirror", "url": "https://mirror.example/youtube-{version}.apkm" },
//!     { "name": "uptodown", "url": "https://other.example/youtube/{version}/download" }
//!   ]
//! }
//! ```

use crate::error::{ConfigError, ErrorExt, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SourceEntry {
    Repository {
        user: String,
        repo: String,
        #[serde(default)]
        tag: String,
        #[serde(default)]
        assets: Vec<String>,
    },
    Name {
        name: String,
    },
}

/// A GitHub repository whose release assets a source profile needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRef {
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Release tag selector (`latest`, `prerelease` or a literal tag)
    pub tag: String,
    /// Glob patterns of asset names to download
    pub assets: Vec<String>,
}

/// Default asset patterns: patcher jars and patch bundles
pub const DEFAULT_ASSET_PATTERNS: &[&str] = &["*.jar", "*.rvp"];

/// Parsed `sources/<source>.json`
#[derive(Debug, Clone)]
pub struct SourceProfile {
    /// Display name of the patch distribution
    pub name: String,
    /// Repositories to fetch tooling from
    pub repositories: Vec<RepositoryRef>,
}

impl SourceProfile {
    /// Load the profile for `source` from `sources_dir`
    pub async fn load(sources_dir: &Path, source: &str) -> Result<Self> {
        let path = sources_dir.join(format!("{source}.json"));
        let text = read_profile("source", &path).await?;
        Self::parse(&text, &path)
    }

    /// Parse profile JSON; `path` is used for error messages
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let entries: Vec<SourceEntry> = serde_json::from_str(text).map_err(|e| invalid("source", path, e))?;

        let mut name = None;
        let mut repositories = Vec::new();
        for entry in entries {
            match entry {
                SourceEntry::Name { name: n } if name.is_none() => name = Some(n),
                SourceEntry::Name { .. } => {
                    return Err(invalid("source", path, "more than one \"name\" entry"));
                }
                SourceEntry::Repository { user, repo, tag, assets } => repositories.push(RepositoryRef {
                    owner: user,
                    repo,
                    tag,
                    assets: if assets.is_empty() {
                        DEFAULT_ASSET_PATTERNS.iter().map(|p| p.to_string()).collect()
                    } else {
                        assets
                    },
                }),
            }
        }

        let name = name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| invalid("source", path, "missing \"name\" entry"))?;
        if repositories.is_empty() {
            return Err(invalid("source", path, "no repositories listed"));
        }

        Ok(Self { name, repositories })
    }
}

/// One download mirror of an app profile
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MirrorEntry {
    /// Provider name used in logs (e.g. `apkmirror`)
    pub name: String,
    /// URL template; `{version}` is replaced by the resolved version
    pub url: String,
    /// File extension of the download when the URL does not reveal it
    #[serde(default)]
    pub extension: Option<String>,
}

/// Parsed `apps/<app>.json`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppProfile {
    /// Android package name
    #[serde(default)]
    pub package: Option<String>,
    /// Version to build instead of negotiating with the patcher
    #[serde(default)]
    pub version: Option<String>,
    /// Mirrors in preference order
    #[serde(default)]
    pub mirrors: Vec<MirrorEntry>,
}

impl AppProfile {
    /// Load the profile for `app`; a missing file yields an empty profile
    pub async fn load(apps_dir: &Path, app: &str) -> Result<Self> {
        let path = apps_dir.join(format!("{app}.json"));
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            log::warn!(
                "No app profile at {}; only locally cached packages can be used",
                path.display()
            );
            return Ok(Self::default());
        }

        let text = read_profile("app", &path).await?;
        Self::parse(&text, &path)
    }

    /// Parse profile JSON; `path` is used for error messages
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let profile: Self = serde_json::from_str(text).map_err(|e| invalid("app", path, e))?;
        for mirror in &profile.mirrors {
            url::Url::parse(&mirror.url.replace("{version}", "0"))
                .map_err(|e| invalid("app", path, format!("mirror '{}': {e}", mirror.name)))?;
        }
        Ok(profile)
    }
}

async fn read_profile(kind: &'static str, path: &Path) -> Result<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ConfigError::ProfileNotFound {
            kind,
            path: path.to_path_buf(),
        }
        .into()),
        Err(e) => Err(e).fs_context("reading profile", path),
    }
}

fn invalid(kind: &'static str, path: &Path, reason: impl ToString) -> crate::BuildError {
    ConfigError::InvalidProfile {
        kind,
        path: PathBuf::from(path),
        reason: reason.to_string(),
    }
    .into()
}
