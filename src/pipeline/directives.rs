//! Include/exclude directives for the patcher.
//!
//! `<patches_dir>/<app>-<source>.txt` holds one directive per line:
//!
//! ```text
//! - Hide ads
//! + Custom branding
//! ```
//!
//! Lines starting with `-` exclude a patch, lines starting with `+` include
//! one; everything else is ignored.

use super::BuildTarget;
use crate::error::{ErrorExt, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Whether a directive enables or disables a patch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveMode {
    /// `+name`
    Include,
    /// `-name`
    Exclude,
}

/// One parsed directive line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Include or exclude
    pub mode: DirectiveMode,
    /// Patch name as written after the marker
    pub name: String,
}

/// Directives in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchDirectiveSet {
    entries: Vec<Directive>,
}

impl PatchDirectiveSet {
    /// Location of the directive file for `target`
    pub fn path_for(target: &BuildTarget, patches_dir: &Path) -> PathBuf {
        patches_dir.join(format!("{}-{}.txt", target.app_name, target.source))
    }

    /// Read the directive file for `target`; a missing file is an empty set
    pub async fn select(target: &BuildTarget, patches_dir: &Path) -> Result<Self> {
        let path = Self::path_for(target, patches_dir);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => {
                log::info!("Reading patch directives from {}", path.display());
                Ok(Self::parse(&text))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No directive file at {}; using default patches", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e).fs_context("reading directive file", path),
        }
    }

    /// Parse directive text
    pub fn parse(text: &str) -> Self {
        let mut entries = Vec::new();
        for line in text.lines().map(str::trim) {
            let (mode, rest) = if let Some(rest) = line.strip_prefix('-') {
                (DirectiveMode::Exclude, rest)
            } else if let Some(rest) = line.strip_prefix('+') {
                (DirectiveMode::Include, rest)
            } else {
                continue;
            };

            let name = rest.trim();
            if name.is_empty() {
                log::warn!("Ignoring directive without a patch name: '{line}'");
                continue;
            }
            entries.push(Directive {
                mode,
                name: name.to_string(),
            });
        }
        Self { entries }
    }

    /// All directives in file order
    pub fn entries(&self) -> &[Directive] {
        &self.entries
    }

    /// Whether there are no directives
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Excluded patch names in file order
    pub fn excludes(&self) -> Vec<&str> {
        self.names(DirectiveMode::Exclude)
    }

    /// Included patch names in file order
    pub fn includes(&self) -> Vec<&str> {
        self.names(DirectiveMode::Include)
    }

    /// Patcher arguments: every `-d <name>` followed by every `-e <name>`
    pub fn to_args(&self) -> Vec<OsString> {
        let excludes = self.excludes().into_iter().flat_map(|n| ["-d", n]);
        let includes = self.includes().into_iter().flat_map(|n| ["-e", n]);
        excludes.chain(includes).map(OsString::from).collect()
    }

    fn names(&self, mode: DirectiveMode) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|d| d.mode == mode)
            .map(|d| d.name.as_str())
            .collect()
    }
}
