//! Build command implementation.
//!
//! Wires profiles, tooling, providers, locators and the publisher into one
//! pipeline run.

use crate::cli::{Args, OutputManager};
use crate::error::{Context, Result};
use crate::github::{GitHubClient, GitHubPublisher};
use crate::pipeline::{BuildContext, run_build};
use crate::profile::{AppProfile, SourceProfile};
use crate::publish::{LocalPublisher, Publisher};
use crate::source::{CacheProvider, MirrorProvider, SourceProvider, SourceResolver, VersionNegotiator};
use crate::tools::{ApkEditorFetcher, ApkSignerLocator, SystemToolRunner, ToolFetcher, ToolRunner};
use std::sync::Arc;

/// Execute a build for the target named by `args`
pub async fn execute_build(args: Args) -> Result<i32> {
    let output = OutputManager::new(args.quiet);

    // 1. Inputs and profiles
    let target = args.target()?;
    let settings = args.pipeline_settings();
    log::info!("Building {} with {}", target.app_name, target.source);

    let source_profile = SourceProfile::load(&args.sources_dir, &target.source).await?;
    let app_profile = AppProfile::load(&args.apps_dir, &target.app_name).await?;

    // 2. Publisher before any download so missing credentials fail fast
    let publisher: Box<dyn Publisher> = if args.no_publish {
        Box::new(LocalPublisher::new(output.clone()))
    } else {
        Box::new(GitHubPublisher::from_env()?)
    };

    // 3. Tooling
    output.section("Tooling");
    let client = GitHubClient::from_env()?;
    let tooling = ToolFetcher::new(client.clone(), args.tools_dir())
        .fetch_required(&source_profile)
        .await
        .with_context(|| format!("fetching {} tooling", source_profile.name))?;
    output.success(&format!("{} tooling ready", tooling.name));

    // 4. Providers: local cache first, then mirrors in profile order
    let runner: Arc<dyn ToolRunner> = Arc::new(SystemToolRunner::new(output.clone()));
    let versions = Arc::new(VersionNegotiator::new(
        runner.clone(),
        settings.java.clone(),
        app_profile.package.clone(),
        app_profile.version.clone(),
    ));

    let downloads_dir = args.downloads_dir();
    let mut providers: Vec<Box<dyn SourceProvider>> =
        vec![Box::new(CacheProvider::new(&downloads_dir, versions.clone()))];
    for mirror in app_profile.mirrors {
        providers.push(Box::new(MirrorProvider::new(
            mirror,
            &downloads_dir,
            client.http().clone(),
            versions.clone(),
        )));
    }
    let resolver = SourceResolver::new(providers);
    log::debug!("Provider order: {}", resolver.provider_names().join(", "));

    // 5. Run
    let merge_tool = ApkEditorFetcher::new(client, args.tools_dir());
    let signing_tool = ApkSignerLocator::from_env();
    let ctx = BuildContext {
        settings: &settings,
        runner: runner.as_ref(),
        resolver: &resolver,
        merge_tool: &merge_tool,
        signing_tool: &signing_tool,
        publisher: publisher.as_ref(),
        output: &output,
    };

    let signed = run_build(&ctx, &target, &tooling).await?;
    log::info!("Build finished: {}", signed.path.display());

    Ok(0)
}
