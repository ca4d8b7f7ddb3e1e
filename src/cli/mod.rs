//! Command line interface for kodegen_bundler_apk.

mod args;
pub mod commands;
mod output;

pub use args::Args;
pub use commands::execute_build;
pub use output::OutputManager;

use crate::error::Result;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute_build(args).await
}
