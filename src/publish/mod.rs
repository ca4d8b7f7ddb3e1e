//! Hand-off of the signed package to a release publisher.

use crate::BoxFuture;
use crate::cli::OutputManager;
use crate::error::Result;
use crate::pipeline::SignedArtifact;
use std::path::Path;

/// Everything a publisher receives about a finished build
#[derive(Debug, Clone, Copy)]
pub struct PublishRequest<'a> {
    /// Application short name
    pub app: &'a str,
    /// Display name of the patch distribution
    pub name: &'a str,
    /// Patch bundle the package was built with
    pub patch_bundle: &'a Path,
    /// Patcher the package was built with
    pub patcher: &'a Path,
    /// The signed package
    pub artifact: &'a SignedArtifact,
}

impl PublishRequest<'_> {
    /// Release tag for this build: `<app>-<name>-v<version>`
    pub fn tag(&self) -> String {
        format!("{}-{}-v{}", self.app, self.name, self.artifact.version)
    }
}

/// Receives the signed package at the end of a build
pub trait Publisher: Send + Sync {
    /// Publish the artifact described by `request`
    fn publish<'a>(&'a self, request: &'a PublishRequest<'a>) -> BoxFuture<'a, Result<()>>;
}

/// Publisher that only reports the artifact (`--no-publish`)
#[derive(Debug, Clone, Default)]
pub struct LocalPublisher {
    output: OutputManager,
}

impl LocalPublisher {
    /// Publisher reporting through `output`
    pub fn new(output: OutputManager) -> Self {
        Self { output }
    }
}

impl Publisher for LocalPublisher {
    fn publish<'a>(&'a self, request: &'a PublishRequest<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            log::info!("Publishing disabled; keeping {}", request.artifact.path.display());
            self.output.info(&format!(
                "{} left at {} (patches {}, patcher {})",
                request.tag(),
                request.artifact.path.display(),
                file_name(request.patch_bundle),
                file_name(request.patcher),
            ));
            Ok(())
        })
    }
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn tag_combines_app_name_and_version() {
        let artifact = SignedArtifact {
            path: PathBuf::from("demo-alpha-v1.2.3.apk"),
            version: "1.2.3".to_string(),
            name: "alpha".to_string(),
        };
        let request = PublishRequest {
            app: "demo",
            name: "alpha",
            patch_bundle: Path::new("tools/patches.rvp"),
            patcher: Path::new("tools/cli.jar"),
            artifact: &artifact,
        };
        assert_eq!(request.tag(), "demo-alpha-v1.2.3");
        assert_eq!(file_name(request.patch_bundle), "patches.rvp");
    }

    #[tokio::test]
    async fn local_publisher_succeeds() {
        let artifact = SignedArtifact {
            path: PathBuf::from("demo-alpha-v1.2.3.apk"),
            version: "1.2.3".to_string(),
            name: "alpha".to_string(),
        };
        let request = PublishRequest {
            app: "demo",
            name: "alpha",
            patch_bundle: Path::new("patches.rvp"),
            patcher: Path::new("cli.jar"),
            artifact: &artifact,
        };
        LocalPublisher::new(OutputManager::new(true))
            .publish(&request)
            .await
            .unwrap();
    }
}
