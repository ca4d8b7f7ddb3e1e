//! The build pipeline: select, resolve, normalize, patch, sign, publish.
//!
//! Stages run strictly in order and every external process is awaited before
//! the next stage starts. Only one working artifact is live at a time: each
//! stage deletes its input once the artifact it derived has been verified on
//! disk.

pub mod directives;
pub mod normalize;
pub mod patch;
pub mod sign;
mod strip;

pub use directives::{Directive, DirectiveMode, PatchDirectiveSet};
pub use sign::SigningIdentity;
pub use strip::DEFAULT_STRIPPED_ABIS;

use crate::cli::OutputManager;
use crate::error::Result;
use crate::publish::{PublishRequest, Publisher};
use crate::source::{ResolveRequest, SourceResolver};
use crate::tools::{ToolLocator, ToolRunner, Tooling};
use std::path::PathBuf;

/// What to build, fixed for the lifetime of the process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    /// Application short name (e.g. `youtube`)
    pub app_name: String,
    /// Patch source short name (e.g. `revanced`)
    pub source: String,
}

impl BuildTarget {
    /// Target for `app_name` patched with `source`
    pub fn new(app_name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            source: source.into(),
        }
    }
}

/// Paths and identities the stages use
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Directory patched and signed packages are written to
    pub work_dir: PathBuf,
    /// Directory holding `<app>-<source>.txt` directive files
    pub patches_dir: PathBuf,
    /// Java launcher for the patcher and the merge tool
    pub java: PathBuf,
    /// Keystore identity handed to the signer
    pub signing: SigningIdentity,
    /// Native library directories removed before patching
    pub strip_abis: Vec<String>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            patches_dir: PathBuf::from("patches"),
            java: PathBuf::from("java"),
            signing: SigningIdentity::default(),
            strip_abis: DEFAULT_STRIPPED_ABIS.iter().map(|abi| abi.to_string()).collect(),
        }
    }
}

/// Collaborators of one build
pub struct BuildContext<'a> {
    /// Paths and identities
    pub settings: &'a PipelineSettings,
    /// Runs every external process
    pub runner: &'a dyn ToolRunner,
    /// Ordered package providers
    pub resolver: &'a SourceResolver,
    /// Locates the bundle merge tool
    pub merge_tool: &'a dyn ToolLocator,
    /// Locates the signing tool
    pub signing_tool: &'a dyn ToolLocator,
    /// Receives the signed package
    pub publisher: &'a dyn Publisher,
    /// User-facing output
    pub output: &'a OutputManager,
}

/// The final package of a build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedArtifact {
    /// Location of the signed package
    pub path: PathBuf,
    /// Package version
    pub version: String,
    /// Display name of the patch distribution
    pub name: String,
}

/// Run every stage for `target` and return the published artifact
pub async fn run_build(
    ctx: &BuildContext<'_>,
    target: &BuildTarget,
    tooling: &Tooling,
) -> Result<SignedArtifact> {
    ctx.output.section("Patch selection");
    let directives = PatchDirectiveSet::select(target, &ctx.settings.patches_dir).await?;
    ctx.output.indent(&format!(
        "{} excluded, {} included",
        directives.excludes().len(),
        directives.includes().len()
    ));

    ctx.output.section("Source resolution");
    let request = ResolveRequest {
        app: target.app_name.clone(),
        patcher: tooling.patcher.clone(),
        patch_bundle: tooling.patch_bundle.clone(),
        name: tooling.name.clone(),
    };
    let artifact = ctx.resolver.resolve(&request).await?;
    ctx.output.success(&format!(
        "Resolved {} version {}",
        artifact.path.display(),
        artifact.version
    ));

    ctx.output.section("Normalization");
    let artifact = normalize::normalize(ctx, artifact).await?;

    ctx.output.section("Patching");
    let patched = patch::patch(ctx, &target.app_name, &artifact, tooling, &directives).await?;

    ctx.output.section("Signing");
    let signed = sign::sign(ctx, &target.app_name, &patched, &artifact.version, &artifact.name).await?;

    ctx.output.section("Publishing");
    ctx.publisher
        .publish(&PublishRequest {
            app: &target.app_name,
            name: &signed.name,
            patch_bundle: &tooling.patch_bundle,
            patcher: &tooling.patcher,
            artifact: &signed,
        })
        .await?;

    ctx.output.success(&format!("Built {}", signed.path.display()));
    Ok(signed)
}
