//! Source resolution with ordered provider fallback.
//!
//! Package sources are unreliable: a provider either produces a download or
//! reports that it has nothing (`Ok(None)`). The [`SourceResolver`] walks its
//! providers in order and stops at the first download. Errors returned by a
//! provider are unexpected failures (local I/O, a broken patcher) and abort
//! the build.

mod cache;
mod mirror;
mod versions;

pub use cache::CacheProvider;
pub use mirror::MirrorProvider;
pub use versions::{VersionNegotiator, compare_versions, parse_compatible_versions};

use crate::BoxFuture;
use crate::error::{ResolveError, Result};
use std::path::{Path, PathBuf};

/// Package file extensions a provider may produce
pub const PACKAGE_EXTENSIONS: &[&str] = &["apk", "apkm", "xapk", "apks"];

/// Whether a package is installable as-is or a split bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Plain `.apk`
    SinglePackage,
    /// Split bundle (`.apkm`, `.xapk`, `.apks`, ...) that needs merging
    Bundle,
}

impl ArtifactKind {
    /// Classify by file extension (case-insensitive)
    pub fn of(path: &Path) -> Self {
        let is_apk = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("apk"));
        if is_apk { Self::SinglePackage } else { Self::Bundle }
    }
}

/// The package a build works on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    /// Current location of the package
    pub path: PathBuf,
    /// Version string reported by the provider
    pub version: String,
    /// Display name of the patch distribution
    pub name: String,
    /// Package format
    pub kind: ArtifactKind,
}

/// What a provider hands back on success
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// Downloaded (or cached) file
    pub path: PathBuf,
    /// Version of the package
    pub version: String,
}

impl Download {
    /// Download at `path` with `version`
    pub fn new(path: impl Into<PathBuf>, version: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            version: version.into(),
        }
    }
}

/// Input shared by every provider
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    /// Application short name
    pub app: String,
    /// Patcher CLI jar
    pub patcher: PathBuf,
    /// Patch bundle
    pub patch_bundle: PathBuf,
    /// Display name of the patch distribution
    pub name: String,
}

/// A place a package can come from
pub trait SourceProvider: Send + Sync {
    /// Name used in logs and in the exhaustion error
    fn name(&self) -> &str;

    /// Try to produce the package; `Ok(None)` means "not found here"
    fn attempt<'a>(&'a self, request: &'a ResolveRequest) -> BoxFuture<'a, Result<Option<Download>>>;
}

/// Tries providers in order until one produces a package
#[derive(Default)]
pub struct SourceResolver {
    providers: Vec<Box<dyn SourceProvider>>,
}

impl std::fmt::Debug for SourceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|p| p.name()))
            .finish()
    }
}

impl SourceResolver {
    /// Resolver over `providers`, tried in the given order
    pub fn new(providers: Vec<Box<dyn SourceProvider>>) -> Self {
        Self { providers }
    }

    /// Provider names in attempt order
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Return the first provider's download, or [`ResolveError::Exhausted`]
    pub async fn resolve(&self, request: &ResolveRequest) -> Result<ResolvedArtifact> {
        let mut tried = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            tried.push(provider.name().to_string());
            log::info!("Trying {} for {}", provider.name(), request.app);

            match provider.attempt(request).await? {
                Some(download) => {
                    log::info!(
                        "{} provided {} version {}",
                        provider.name(),
                        download.path.display(),
                        download.version
                    );
                    let kind = ArtifactKind::of(&download.path);
                    return Ok(ResolvedArtifact {
                        path: download.path,
                        version: download.version,
                        name: request.name.clone(),
                        kind,
                    });
                }
                None => log::warn!("{} has no package for {}", provider.name(), request.app),
            }
        }

        Err(ResolveError::Exhausted {
            app: request.app.clone(),
            tried,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BuildError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        name: &'static str,
        result: Option<Download>,
        calls: Arc<AtomicUsize>,
    }

    impl SourceProvider for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        fn attempt<'a>(&'a self, _request: &'a ResolveRequest) -> BoxFuture<'a, Result<Option<Download>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move { Ok(self.result.clone()) })
        }
    }

    fn request() -> ResolveRequest {
        ResolveRequest {
            app: "demo".to_string(),
            patcher: PathBuf::from("cli.jar"),
            patch_bundle: PathBuf::from("patches.rvp"),
            name: "alpha".to_string(),
        }
    }

    #[test]
    fn kind_follows_extension() {
        assert_eq!(ArtifactKind::of(Path::new("demo.apk")), ArtifactKind::SinglePackage);
        assert_eq!(ArtifactKind::of(Path::new("demo.APK")), ArtifactKind::SinglePackage);
        assert_eq!(ArtifactKind::of(Path::new("demo.apkm")), ArtifactKind::Bundle);
        assert_eq!(ArtifactKind::of(Path::new("demo.xapk")), ArtifactKind::Bundle);
    }

    #[tokio::test]
    async fn first_success_stops_the_walk() {
        let calls = Arc::new(AtomicUsize::new(0));
        let later = Arc::new(AtomicUsize::new(0));
        let resolver = SourceResolver::new(vec![
            Box::new(Scripted { name: "a", result: None, calls: calls.clone() }),
            Box::new(Scripted {
                name: "b",
                result: Some(Download::new("demo.apkm", "2.0")),
                calls: calls.clone(),
            }),
            Box::new(Scripted {
                name: "c",
                result: Some(Download::new("other.apk", "3.0")),
                calls: later.clone(),
            }),
        ]);

        let artifact = resolver.resolve(&request()).await.unwrap();
        assert_eq!(artifact.path, PathBuf::from("demo.apkm"));
        assert_eq!(artifact.kind, ArtifactKind::Bundle);
        assert_eq!(artifact.name, "alpha");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_resolver_is_exhausted() {
        let err = SourceResolver::default().resolve(&request()).await.unwrap_err();
        assert!(matches!(
            err,
            BuildError::Resolve(ResolveError::Exhausted { ref tried, .. }) if tried.is_empty()
        ));
    }
}
