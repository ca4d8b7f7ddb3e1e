//! Split bundle merging.

use super::BuildContext;
use crate::error::{NormalizeError, Result};
use crate::source::{ArtifactKind, ResolvedArtifact};
use crate::tools::{Invocation, OutputMode, labels, run_checked};
use crate::utils::fs;
use std::path::{Path, PathBuf};

/// Path the merged package is written to: the bundle path with `.apk`
pub fn merged_path(bundle: &Path) -> PathBuf {
    bundle.with_extension("apk")
}

/// Turn a bundle into a single installable package
///
/// A `.apk` is returned untouched. Anything else is merged with APKEditor;
/// the bundle is removed only after the merged package exists.
pub async fn normalize(ctx: &BuildContext<'_>, artifact: ResolvedArtifact) -> Result<ResolvedArtifact> {
    if ArtifactKind::of(&artifact.path) == ArtifactKind::SinglePackage {
        ctx.output.indent("Single package, nothing to merge");
        return Ok(artifact);
    }

    let merge_tool = ctx
        .merge_tool
        .locate()
        .await?
        .ok_or(NormalizeError::MergeToolUnavailable)?;

    let merged = merged_path(&artifact.path);
    ctx.output.progress(&format!("Merging {}", artifact.path.display()));

    let invocation = Invocation::java_jar(labels::MERGE, &ctx.settings.java, &merge_tool)
        .arg("m")
        .arg("-i")
        .arg(&artifact.path)
        .arg("-o")
        .arg(&merged)
        .mode(OutputMode::Silent);
    run_checked(ctx.runner, &invocation).await?;

    if !fs::is_file(&merged).await {
        return Err(NormalizeError::MergedArtifactMissing { path: merged }.into());
    }

    fs::remove_file(&artifact.path).await?;
    ctx.output.success(&format!("Merged into {}", merged.display()));

    Ok(ResolvedArtifact {
        path: merged,
        kind: ArtifactKind::SinglePackage,
        ..artifact
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merged_path_swaps_extension() {
        assert_eq!(
            merged_path(Path::new("downloads/demo-1.2.3.apkm")),
            PathBuf::from("downloads/demo-1.2.3.apk")
        );
        assert_eq!(
            merged_path(Path::new("demo.xapk")),
            PathBuf::from("demo.apk")
        );
    }
}
