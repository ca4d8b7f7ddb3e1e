//! kodegen_bundler_apk - builds signed, patched Android packages.
//!
//! Exits 0 when the package was built and handed to the publisher, 1 on any
//! fatal condition.

use kodegen_bundler_apk::cli;
use kodegen_bundler_apk::cli::OutputManager;
use std::process;

#[tokio::main]
async fn main() {
    env_logger::init();

    match cli::run().await {
        Ok(exit_code) => {
            process::exit(exit_code);
        }
        Err(e) => {
            log::error!("{e}");

            // Never quiet for fatal errors
            let output = OutputManager::new(false);
            output.error(&format!("Fatal error: {e}"));

            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() {
                output.println("\n💡 Recovery suggestions:");
                for suggestion in suggestions {
                    output.indent(&suggestion);
                }
            }

            process::exit(1);
        }
    }
}
