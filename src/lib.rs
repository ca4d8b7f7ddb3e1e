//! # Kodegen Bundler APK
//!
//! Builds signed, patched Android packages from community patch sets.
//!
//! A build resolves an unmodified package from an ordered list of unreliable
//! sources, merges split bundles into a single package when needed, applies
//! the patch bundle with the external patching tool, signs the result with a
//! fixed public keystore identity and hands it to a release publisher.
//!
//! ## Pipeline
//!
//! | Stage | Module | External process |
//! |-------|--------|------------------|
//! | Patch-set selection | [`pipeline::directives`] | none |
//! | Source resolution | [`source`] | `list-versions` (negotiation) |
//! | Format normalization | [`pipeline::normalize`] | APKEditor merge |
//! | Patching | [`pipeline::patch`] | patcher CLI |
//! | Signing | [`pipeline::sign`] | apksigner |
//! | Publishing | [`publish`] | GitHub release API |
//!
//! ## Usage
//!
//! ```bash
//! APP_NAME=youtube SOURCE=revanced kodegen_bundler_apk
//! kodegen_bundler_apk --app-name youtube --source revanced --no-publish
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Core modules
pub mod cli;
pub mod error;
pub mod github;
pub mod pipeline;
pub mod profile;
pub mod publish;
pub mod source;
pub mod tools;
pub mod utils;

// Re-export main types for public API
pub use cli::Args;
pub use error::{BuildError, Result};
pub use pipeline::{BuildContext, BuildTarget, PipelineSettings, SignedArtifact, run_build};
pub use publish::{PublishRequest, Publisher};
pub use source::{ResolvedArtifact, SourceProvider, SourceResolver};
pub use tools::{Invocation, ToolLocator, ToolRunner, Tooling};

use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by the pluggable collaborators (runners, providers,
/// locators, publishers) so they can live behind trait objects.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
