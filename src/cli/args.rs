//! Command line argument parsing and validation.
//!
//! Every option can also be supplied through the environment, so CI jobs can
//! drive a build with `APP_NAME` and `SOURCE` alone.

use crate::error::{ConfigError, Result};
use crate::pipeline::{BuildTarget, PipelineSettings, SigningIdentity};
use clap::Parser;
use std::path::PathBuf;

/// Build a signed, patched Android package
#[derive(Parser, Debug, Clone)]
#[command(
    name = "kodegen_bundler_apk",
    version,
    about = "Build a signed, patched Android package",
    long_about = "Resolve an Android package from its mirrors, apply a community patch set and sign the result.

Usage:
  APP_NAME=youtube SOURCE=revanced kodegen_bundler_apk
  kodegen_bundler_apk --app-name youtube --source revanced --no-publish"
)]
pub struct Args {
    /// Application short name (selects apps/<app>.json)
    #[arg(long, env = "APP_NAME", value_name = "APP")]
    pub app_name: Option<String>,

    /// Patch source short name (selects sources/<source>.json)
    #[arg(long, env = "SOURCE", value_name = "SOURCE")]
    pub source: Option<String>,

    /// Directory for downloads, tools and built packages
    #[arg(long, env = "WORK_DIR", default_value = ".")]
    pub work_dir: PathBuf,

    /// Directory holding <app>-<source>.txt directive files
    #[arg(long, env = "PATCHES_DIR", default_value = "patches")]
    pub patches_dir: PathBuf,

    /// Directory holding source profiles
    #[arg(long, env = "SOURCES_DIR", default_value = "sources")]
    pub sources_dir: PathBuf,

    /// Directory holding app profiles
    #[arg(long, env = "APPS_DIR", default_value = "apps")]
    pub apps_dir: PathBuf,

    /// Java launcher used for the patcher and merge tool
    #[arg(long, env = "JAVA", default_value = "java")]
    pub java: PathBuf,

    /// Keystore used for signing
    #[arg(long, env = "KEYSTORE")]
    pub keystore: Option<PathBuf>,

    /// Keep the signed package locally instead of creating a GitHub release
    #[arg(long, env = "NO_PUBLISH")]
    pub no_publish: bool,

    /// Suppress progress output
    #[arg(short, long, env = "QUIET")]
    pub quiet: bool,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Application and source to build; both are required and non-empty
    pub fn target(&self) -> Result<BuildTarget> {
        let app_name = required(&self.app_name, "Application name", "app-name", "APP_NAME")?;
        let source = required(&self.source, "Patch source", "source", "SOURCE")?;
        Ok(BuildTarget::new(app_name, source))
    }

    /// Stage settings derived from the arguments
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            work_dir: self.work_dir.clone(),
            patches_dir: self.patches_dir.clone(),
            java: self.java.clone(),
            signing: self
                .keystore
                .clone()
                .map(SigningIdentity::with_keystore)
                .unwrap_or_default(),
            ..PipelineSettings::default()
        }
    }

    /// Where downloaded tooling is cached
    pub fn tools_dir(&self) -> PathBuf {
        self.work_dir.join("tools")
    }

    /// Where downloaded packages are stored
    pub fn downloads_dir(&self) -> PathBuf {
        self.work_dir.join("downloads")
    }
}

fn required(
    value: &Option<String>,
    name: &'static str,
    flag: &'static str,
    env: &'static str,
) -> Result<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ConfigError::MissingValue { name, flag, env }.into())
}
