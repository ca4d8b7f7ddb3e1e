//! Error types for patched package builds.
//!
//! Every fatal condition of the build maps to one variant of [`BuildError`]
//! so `main` can print a message plus recovery suggestions and exit with 1.

use std::fmt::Display;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for build operations
pub type Result<T> = std::result::Result<T, BuildError>;

/// Main error type for all build operations
#[derive(Error, Debug)]
pub enum BuildError {
    /// Configuration errors (missing inputs, unreadable profiles)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Source resolution errors
    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// External tool errors
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// Bundle merge errors
    #[error("Normalize error: {0}")]
    Normalize(#[from] NormalizeError),

    /// Signing errors
    #[error("Sign error: {0}")]
    Sign(#[from] SignError),

    /// Release publishing errors
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    /// File system error with path context.
    #[error("{context} {path}: {error}")]
    Fs {
        /// Operation being performed (e.g. "reading directive file")
        context: &'static str,
        /// Path that was being accessed
        path: PathBuf,
        /// The underlying I/O error
        error: io::Error,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// GitHub API request failed
    #[error("GitHub API {operation} failed: {message}")]
    GitHub {
        /// Operation being performed
        operation: &'static str,
        /// Error reported by the API client
        message: String,
    },

    /// URL parsing error.
    #[error("{0}")]
    UrlParse(#[from] url::ParseError),

    /// ZIP archive read/write error.
    #[error("{0}")]
    Zip(#[from] zip::result::ZipError),

    /// Background task failed to complete.
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Error with context. Created by the [`Context`] trait.
    #[error("{0}: {1}")]
    Context(String, Box<Self>),

    /// Generic error with custom message.
    #[error("{0}")]
    Generic(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required configuration value was not supplied
    #[error("{name} must be set (flag --{flag} or environment variable {env})")]
    MissingValue {
        /// Human readable name of the value
        name: &'static str,
        /// Command line flag
        flag: &'static str,
        /// Environment variable
        env: &'static str,
    },

    /// Profile file not found
    #[error("{kind} profile not found at {path}")]
    ProfileNotFound {
        /// Profile kind ("source" or "app")
        kind: &'static str,
        /// Expected location
        path: PathBuf,
    },

    /// Profile file is present but malformed
    #[error("invalid {kind} profile {path}: {reason}")]
    InvalidProfile {
        /// Profile kind ("source" or "app")
        kind: &'static str,
        /// Profile location
        path: PathBuf,
        /// What is wrong with it
        reason: String,
    },

    /// A required tool file was not among the downloaded files
    #[error("no {description} found among downloaded files")]
    MissingTool {
        /// Description of the missing file (e.g. "patcher .jar")
        description: String,
    },
}

/// Source resolution errors
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Every provider was tried and none produced an artifact
    #[error("no provider produced a package for '{app}' (tried: {})", .tried.join(", "))]
    Exhausted {
        /// Application that was being resolved
        app: String,
        /// Provider names in the order they were attempted
        tried: Vec<String>,
    },
}

/// External tool errors
#[derive(Error, Debug)]
pub enum ToolError {
    /// Process could not be started
    #[error("failed to run {tool}: {error}")]
    Spawn {
        /// Tool label
        tool: String,
        /// Underlying spawn error
        error: io::Error,
    },

    /// Process exited with a failure status
    #[error("{tool} exited with status {}{}", describe_code(.code), describe_stderr(.stderr))]
    NonZeroExit {
        /// Tool label
        tool: String,
        /// Exit code, `None` if terminated by a signal
        code: Option<i32>,
        /// Captured standard error, empty when streamed
        stderr: String,
    },
}

/// Bundle normalization errors
#[derive(Error, Debug)]
pub enum NormalizeError {
    /// Merge tool reported success but produced nothing
    #[error("merged artifact not found at {path}")]
    MergedArtifactMissing {
        /// Expected merge output
        path: PathBuf,
    },

    /// Merge tool could not be located or downloaded
    #[error("merge tool unavailable")]
    MergeToolUnavailable,
}

/// Signing errors
#[derive(Error, Debug)]
pub enum SignError {
    /// Signing tool could not be found
    #[error("apksigner not found (checked APKSIGNER, PATH and Android SDK build-tools)")]
    ToolUnavailable,

    /// Signed output would overwrite the unsigned input
    #[error("signed package {path} would overwrite the unsigned package; choose another source name")]
    OutputCollides {
        /// Path shared by input and output
        path: PathBuf,
    },

    /// Signing tool reported success but produced nothing
    #[error("signed artifact not found at {path}")]
    SignedArtifactMissing {
        /// Expected signer output
        path: PathBuf,
    },
}

/// Release publishing errors
#[derive(Error, Debug)]
pub enum PublishError {
    /// Credentials or repository not configured
    #[error("{variable} is not set; cannot publish release")]
    MissingEnvironment {
        /// Missing environment variable
        variable: &'static str,
    },

}

fn describe_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "<signal>".to_string(), |c| c.to_string())
}

fn describe_stderr(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(":\n{stderr}")
    }
}

impl BuildError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            BuildError::Config(ConfigError::MissingValue { env, flag, .. }) => vec![
                format!("Export {env}=<value> before running"),
                format!("Or pass --{flag} <value>"),
            ],
            BuildError::Config(ConfigError::ProfileNotFound { path, .. }) => vec![format!(
                "Create {} or check --sources-dir / --apps-dir",
                path.display()
            )],
            BuildError::Resolve(ResolveError::Exhausted { .. }) => vec![
                "Check the mirror URLs in the app profile".to_string(),
                "Pin a known-good version in the app profile".to_string(),
                "Place a pre-downloaded package in the downloads directory".to_string(),
            ],
            BuildError::Tool(ToolError::Spawn { .. }) => vec![
                "Ensure a Java runtime is installed and on PATH (or pass --java)".to_string(),
            ],
            BuildError::Sign(SignError::ToolUnavailable) => vec![
                "Install Android SDK build-tools and set ANDROID_HOME".to_string(),
                "Or set APKSIGNER to the apksigner executable".to_string(),
            ],
            BuildError::Publish(PublishError::MissingEnvironment { .. }) => vec![
                "Set GITHUB_TOKEN and GITHUB_REPOSITORY (owner/repo)".to_string(),
                "Or pass --no-publish to skip the release".to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }
}

/// Trait for adding context to errors.
pub trait Context<T> {
    /// Add context to an error using a closure (lazy evaluation).
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T> Context<T> for Result<T> {
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| BuildError::Context(f().to_string(), Box::new(e)))
    }
}

/// Extension trait for filesystem operations with automatic path context.
pub trait ErrorExt<T> {
    /// Add filesystem context to an I/O error.
    ///
    /// The `context` should be a present-tense verb phrase describing the operation,
    /// e.g., "reading file", "removing bundle".
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, io::Error> {
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|error| BuildError::Fs {
            context,
            path: path.into(),
            error,
        })
    }
}

/// Macro for early return with a [`BuildError::Generic`].
#[macro_export]
macro_rules! bail {
    ($msg:literal $(,)?) => {
        return Err($crate::error::BuildError::Generic($msg.into()))
    };
    ($err:expr $(,)?) => {
        return Err($crate::error::BuildError::Generic($err.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::error::BuildError::Generic(format!($fmt, $($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_lists_providers_in_order() {
        let err = BuildError::from(ResolveError::Exhausted {
            app: "demo".to_string(),
            tried: vec!["cache".to_string(), "apkmirror".to_string()],
        });
        let message = err.to_string();
        assert!(message.contains("'demo'"));
        assert!(message.contains("cache, apkmirror"));
    }

    #[test]
    fn non_zero_exit_includes_stderr_when_captured() {
        let err = ToolError::NonZeroExit {
            tool: "merge tool".to_string(),
            code: Some(2),
            stderr: "bad input".to_string(),
        };
        assert_eq!(err.to_string(), "merge tool exited with status 2:\nbad input");

        let streamed = ToolError::NonZeroExit {
            tool: "patcher".to_string(),
            code: None,
            stderr: String::new(),
        };
        assert_eq!(streamed.to_string(), "patcher exited with status <signal>");
    }

    #[test]
    fn with_context_wraps_inner_error() {
        let failed: Result<u8> = Err(BuildError::Generic("no assets".to_string()));
        let err = failed.with_context(|| "fetching alpha tooling").unwrap_err();
        assert!(matches!(err, BuildError::Context(ref m, _) if m == "fetching alpha tooling"));
        assert_eq!(err.to_string(), "fetching alpha tooling: no assets");
    }

    #[test]
    fn fs_context_keeps_path() {
        let io: std::result::Result<(), io::Error> =
            Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let err = io.fs_context("reading directive file", "patches/demo-alpha.txt").unwrap_err();
        assert_eq!(err.to_string(), "reading directive file patches/demo-alpha.txt: gone");
    }

    #[test]
    fn missing_value_suggests_env_and_flag() {
        let err = BuildError::from(ConfigError::MissingValue {
            name: "Application name",
            flag: "app-name",
            env: "APP_NAME",
        });
        let suggestions = err.recovery_suggestions();
        assert!(suggestions.iter().any(|s| s.contains("APP_NAME")));
        assert!(suggestions.iter().any(|s| s.contains("--app-name")));
    }
}
