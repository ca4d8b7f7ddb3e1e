//! Version negotiation with the patcher's `list-versions` command.

use crate::error::Result;
use crate::tools::{Invocation, OutputMode, ToolRunner, labels, run_checked};
use regex::Regex;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tokio::sync::OnceCell;

static VERSION_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?P<version>\d+(?:\.\d+)+)\s*(?:\((?P<count>\d+)\s+patch(?:es)?\))?\s*$")
        .expect("version line regex is valid")
});

/// Compatible versions in `list-versions` output, with their patch counts
///
/// Lines look like `19.16.39 (12 patches)`; the count is optional.
pub fn parse_compatible_versions(output: &str) -> Vec<(String, u32)> {
    VERSION_LINE_RE
        .captures_iter(output)
        .map(|caps| {
            let count = caps
                .name("count")
                .and_then(|c| c.as_str().parse().ok())
                .unwrap_or(0);
            (caps["version"].to_string(), count)
        })
        .collect()
}

/// Compare dotted version strings numerically, segment by segment
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (Some(x), Some(y)) => {
                let ordering = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    _ => x.cmp(y),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

/// Version supported by the most patches, the highest on a tie
fn best_version(candidates: Vec<(String, u32)>) -> Option<String> {
    candidates
        .into_iter()
        .max_by(|(va, ca), (vb, cb)| ca.cmp(cb).then_with(|| compare_versions(va, vb)))
        .map(|(version, _)| version)
}

/// Decides which package version to fetch, once per build
pub struct VersionNegotiator {
    runner: Arc<dyn ToolRunner>,
    java: PathBuf,
    package: Option<String>,
    pinned: Option<String>,
    negotiated: OnceCell<Option<String>>,
}

impl std::fmt::Debug for VersionNegotiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionNegotiator")
            .field("package", &self.package)
            .field("pinned", &self.pinned)
            .field("negotiated", &self.negotiated.get())
            .finish()
    }
}

impl VersionNegotiator {
    /// Negotiator for `package`; a `pinned` version skips the patcher query
    pub fn new(
        runner: Arc<dyn ToolRunner>,
        java: impl Into<PathBuf>,
        package: Option<String>,
        pinned: Option<String>,
    ) -> Self {
        Self {
            runner,
            java: java.into(),
            package,
            pinned,
            negotiated: OnceCell::new(),
        }
    }

    /// Version to fetch, `None` when nothing can be determined
    pub async fn version(&self, patcher: &Path, patch_bundle: &Path) -> Result<Option<String>> {
        if let Some(pinned) = &self.pinned {
            return Ok(Some(pinned.clone()));
        }

        self.negotiated
            .get_or_try_init(|| self.query(patcher, patch_bundle))
            .await
            .cloned()
    }

    async fn query(&self, patcher: &Path, patch_bundle: &Path) -> Result<Option<String>> {
        let Some(package) = &self.package else {
            log::warn!("No package name configured; cannot ask the patcher for compatible versions");
            return Ok(None);
        };

        let invocation = Invocation::java_jar(labels::LIST_VERSIONS, &self.java, patcher)
            .arg("list-versions")
            .arg("-f")
            .arg(package)
            .arg(patch_bundle)
            .mode(OutputMode::Capture);
        let output = run_checked(self.runner.as_ref(), &invocation).await?;

        let version = best_version(parse_compatible_versions(&output.stdout));
        match &version {
            Some(v) => log::info!("Patches target {package} version {v}"),
            None => log::warn!("Patcher reported no specific compatible version for {package}"),
        }
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BoxFuture;
    use crate::tools::ToolOutput;
    use std::sync::Mutex;

    const LISTING: &str = "\
INFO: Getting compatible versions
Package name: com.example.demo
Most common compatible versions:
    19.09.37 (5 patches)
    19.16.39 (12 patches)
    19.11.43 (12 patches)
";

    struct Listing {
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl ToolRunner for Listing {
        fn run<'a>(&'a self, invocation: &'a Invocation) -> BoxFuture<'a, Result<ToolOutput>> {
            self.calls.lock().unwrap().push(invocation.args_lossy());
            Box::pin(async move { Ok(ToolOutput::succeeded(LISTING)) })
        }
    }

    #[test]
    fn parses_versions_and_counts() {
        let versions = parse_compatible_versions(LISTING);
        assert_eq!(
            versions,
            vec![
                ("19.09.37".to_string(), 5),
                ("19.16.39".to_string(), 12),
                ("19.11.43".to_string(), 12),
            ]
        );
        assert!(parse_compatible_versions("Any version").is_empty());
    }

    #[test]
    fn numeric_comparison_beats_lexical() {
        assert_eq!(compare_versions("19.9.1", "19.10.0"), Ordering::Less);
        assert_eq!(compare_versions("2.0", "2.0.1"), Ordering::Less);
        assert_eq!(compare_versions("1.2.3", "1.2.3"), Ordering::Equal);
    }

    #[test]
    fn best_version_prefers_patch_count_then_version() {
        assert_eq!(
            best_version(parse_compatible_versions(LISTING)),
            Some("19.16.39".to_string())
        );
        assert_eq!(best_version(Vec::new()), None);
    }

    #[tokio::test]
    async fn negotiates_once_per_build() {
        let runner = Arc::new(Listing { calls: Mutex::new(Vec::new()) });
        let negotiator = VersionNegotiator::new(
            runner.clone(),
            "java",
            Some("com.example.demo".to_string()),
            None,
        );

        for _ in 0..2 {
            let version = negotiator
                .version(Path::new("cli.jar"), Path::new("patches.rvp"))
                .await
                .unwrap();
            assert_eq!(version.as_deref(), Some("19.16.39"));
        }

        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            vec!["-jar", "cli.jar", "list-versions", "-f", "com.example.demo", "patches.rvp"]
        );
    }

    #[tokio::test]
    async fn pinned_version_skips_patcher() {
        let runner = Arc::new(Listing { calls: Mutex::new(Vec::new()) });
        let negotiator = VersionNegotiator::new(runner.clone(), "java", None, Some("1.2.3".to_string()));

        let version = negotiator
            .version(Path::new("cli.jar"), Path::new("patches.rvp"))
            .await
            .unwrap();
        assert_eq!(version.as_deref(), Some("1.2.3"));
        assert!(runner.calls.lock().unwrap().is_empty());
    }
}
