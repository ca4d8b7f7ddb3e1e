//! Applying the patch bundle with the patcher CLI.

use super::{BuildContext, PatchDirectiveSet, strip};
use crate::error::Result;
use crate::source::ResolvedArtifact;
use crate::tools::{Invocation, OutputMode, Tooling, labels, run_checked};
use crate::utils::fs;
use std::path::PathBuf;

/// File name of the patched, unsigned package
pub fn patched_file_name(app: &str, version: &str) -> String {
    format!("{app}-patch-v{version}.apk")
}

/// Patch `artifact` and return the unsigned output
///
/// On success the input package is removed. A failed patcher run is fatal and
/// leaves the input in place.
pub async fn patch(
    ctx: &BuildContext<'_>,
    app: &str,
    artifact: &ResolvedArtifact,
    tooling: &Tooling,
    directives: &PatchDirectiveSet,
) -> Result<PathBuf> {
    match strip::strip_abis(&artifact.path, &ctx.settings.strip_abis).await {
        Ok(0) => log::debug!("No native libraries to strip"),
        Ok(dropped) => ctx
            .output
            .indent(&format!("Stripped {dropped} native library entries")),
        Err(e) => {
            log::warn!("Could not strip native libraries from {}: {e}", artifact.path.display());
            ctx.output.warn("Native library stripping skipped");
        }
    }

    let output = ctx
        .settings
        .work_dir
        .join(patched_file_name(app, &artifact.version));

    let invocation = Invocation::java_jar(labels::PATCH, &ctx.settings.java, &tooling.patcher)
        .arg("patch")
        .arg("--patches")
        .arg(&tooling.patch_bundle)
        .arg("--out")
        .arg(&output)
        .arg(&artifact.path)
        .args(directives.to_args())
        .mode(OutputMode::Stream);

    ctx.output.progress(&format!("Patching {}", artifact.path.display()));
    log::debug!("{}", invocation.command_line());
    run_checked(ctx.runner, &invocation).await?;

    if !fs::is_file(&output).await {
        crate::bail!("patcher did not produce {}", output.display());
    }

    fs::remove_file(&artifact.path).await?;
    ctx.output.success(&format!("Patched {}", output.display()));
    Ok(output)
}
