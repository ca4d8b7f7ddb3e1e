//! External tool invocation and lookup.
//!
//! Every external process of a build (merge tool, patcher, signer,
//! `list-versions`) is described by an [`Invocation`] and executed through a
//! [`ToolRunner`]. Tools that must be found or downloaded before they can run
//! are resolved through a [`ToolLocator`].

mod apksigner;
mod fetch;
mod runner;

pub use apksigner::ApkSignerLocator;
pub use fetch::{ApkEditorFetcher, ToolFetcher, Tooling, find_file};
pub use runner::SystemToolRunner;

use crate::BoxFuture;
use crate::error::{Result, ToolError};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Labels attached to the invocations the pipeline issues.
pub mod labels {
    /// APKEditor merge of a split bundle
    pub const MERGE: &str = "merge tool";
    /// Patcher `patch` command
    pub const PATCH: &str = "patcher";
    /// Patcher `list-versions` command
    pub const LIST_VERSIONS: &str = "patcher list-versions";
    /// apksigner `sign` command
    pub const SIGN: &str = "apksigner";
}

/// How a tool's output is handled while it runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Standard output discarded; standard error kept for failure reports
    Silent,
    /// Both streams forwarded line by line to the terminal
    Stream,
    /// Both streams captured and returned
    Capture,
}

/// A single external process invocation
#[derive(Debug, Clone)]
pub struct Invocation {
    label: String,
    program: PathBuf,
    args: Vec<OsString>,
    mode: OutputMode,
}

impl Invocation {
    /// Invoke `program` directly
    pub fn new(label: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            program: program.into(),
            args: Vec::new(),
            mode: OutputMode::Stream,
        }
    }

    /// Invoke a jar through the given Java launcher (`java -jar <jar>`)
    pub fn java_jar(label: impl Into<String>, java: &Path, jar: &Path) -> Self {
        Self::new(label, java).arg("-jar").arg(jar)
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Set the output mode
    pub fn mode(mut self, mode: OutputMode) -> Self {
        self.mode = mode;
        self
    }

    /// Label used in logs and errors
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Executable to run
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments passed to the executable
    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    /// Output handling
    pub fn output_mode(&self) -> OutputMode {
        self.mode
    }

    /// Arguments as lossy UTF-8 strings (logging and inspection)
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    /// Value following `flag` in the argument list
    pub fn value_of(&self, flag: &str) -> Option<&OsStr> {
        self.args
            .iter()
            .position(|a| a.as_os_str() == OsStr::new(flag))
            .and_then(|i| self.args.get(i + 1))
            .map(OsString::as_os_str)
    }

    /// Render as a shell-like command line
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

/// Result of a finished tool process
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    /// Whether the process reported success
    pub success: bool,
    /// Captured standard output (empty unless [`OutputMode::Capture`])
    pub stdout: String,
    /// Captured standard error (empty when streamed)
    pub stderr: String,
}

impl ToolOutput {
    /// Output of a successful process with the given stdout
    pub fn succeeded(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Output of a process that exited with `code`
    pub fn failed(code: i32) -> Self {
        Self {
            code: Some(code),
            success: false,
            ..Self::default()
        }
    }

    /// Turn a failure status into [`ToolError::NonZeroExit`]
    pub fn check(self, label: &str) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(ToolError::NonZeroExit {
                tool: label.to_string(),
                code: self.code,
                stderr: self.stderr.trim_end().to_string(),
            }
            .into())
        }
    }
}

/// Executes external processes
///
/// Implementations wait for the process to exit before resolving; there is no
/// timeout or cancellation at this layer.
pub trait ToolRunner: Send + Sync {
    /// Run the invocation to completion and report its exit status
    fn run<'a>(&'a self, invocation: &'a Invocation) -> BoxFuture<'a, Result<ToolOutput>>;
}

/// Run an invocation and fail on a non-zero exit
pub async fn run_checked(runner: &dyn ToolRunner, invocation: &Invocation) -> Result<ToolOutput> {
    runner.run(invocation).await?.check(invocation.label())
}

/// Finds (or fetches) an external tool on demand
pub trait ToolLocator: Send + Sync {
    /// Path of the tool, `None` when it is unavailable
    fn locate<'a>(&'a self) -> BoxFuture<'a, Result<Option<PathBuf>>>;
}

/// A tool whose location is known up front
#[derive(Debug, Clone, Default)]
pub struct FixedTool(Option<PathBuf>);

impl FixedTool {
    /// Tool available at `path`
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self(Some(path.into()))
    }

    /// Tool that is never available
    pub fn unavailable() -> Self {
        Self(None)
    }
}

impl ToolLocator for FixedTool {
    fn locate<'a>(&'a self) -> BoxFuture<'a, Result<Option<PathBuf>>> {
        Box::pin(async move { Ok(self.0.clone()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn java_jar_prefixes_launcher_arguments() {
        let invocation = Invocation::java_jar(labels::PATCH, Path::new("java"), Path::new("cli.jar"))
            .arg("patch")
            .args(["--out", "out.apk"]);

        assert_eq!(invocation.program(), Path::new("java"));
        assert_eq!(
            invocation.args_lossy(),
            vec!["-jar", "cli.jar", "patch", "--out", "out.apk"]
        );
        assert_eq!(invocation.value_of("--out"), Some(OsStr::new("out.apk")));
        assert_eq!(invocation.value_of("--missing"), None);
        assert_eq!(invocation.command_line(), "java -jar cli.jar patch --out out.apk");
    }

    #[test]
    fn check_maps_failure_to_tool_error() {
        let err = ToolOutput::failed(1).check(labels::PATCH).unwrap_err();
        assert!(matches!(
            err,
            crate::BuildError::Tool(ToolError::NonZeroExit { code: Some(1), .. })
        ));
        assert!(ToolOutput::succeeded("").check(labels::PATCH).is_ok());
    }

    #[tokio::test]
    async fn fixed_tool_reports_configured_path() {
        assert_eq!(
            FixedTool::at("/opt/apksigner").locate().await.unwrap(),
            Some(PathBuf::from("/opt/apksigner"))
        );
        assert_eq!(FixedTool::unavailable().locate().await.unwrap(), None);
    }
}
