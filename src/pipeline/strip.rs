//! Removal of unneeded native libraries from a package.
//!
//! Stripping is best-effort: the caller logs any error and patches the
//! package as it is.

use crate::error::{ErrorExt, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// ABIs removed by default (emulator-only architectures)
pub const DEFAULT_STRIPPED_ABIS: &[&str] = &["x86", "x86_64"];

/// Rewrite `package` without `lib/<abi>/` entries; returns how many were dropped
pub async fn strip_abis(package: &Path, abis: &[String]) -> Result<usize> {
    if abis.is_empty() {
        return Ok(0);
    }

    let package = package.to_path_buf();
    let prefixes: Vec<String> = abis.iter().map(|abi| format!("lib/{abi}/")).collect();
    tokio::task::spawn_blocking(move || strip_blocking(&package, &prefixes)).await?
}

fn strip_blocking(package: &Path, prefixes: &[String]) -> Result<usize> {
    let source = File::open(package).fs_context("opening package", package)?;
    let mut archive = zip::ZipArchive::new(BufReader::new(source))?;

    let dropped = archive
        .file_names()
        .filter(|name| is_stripped(name, prefixes))
        .count();
    if dropped == 0 {
        return Ok(0);
    }

    let staging = staging_path(package);
    let outcome = (|| -> Result<()> {
        let target = File::create(&staging).fs_context("creating stripped package", &staging)?;
        let mut writer = zip::ZipWriter::new(target);
        for index in 0..archive.len() {
            let entry = archive.by_index_raw(index)?;
            if is_stripped(entry.name(), prefixes) {
                continue;
            }
            writer.raw_copy_file(entry)?;
        }
        writer.finish()?;
        Ok(())
    })();

    if let Err(error) = outcome {
        let _ = std::fs::remove_file(&staging);
        return Err(error);
    }

    std::fs::rename(&staging, package).fs_context("replacing stripped package", package)?;
    Ok(dropped)
}

fn is_stripped(name: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|prefix| name.starts_with(prefix.as_str()))
}

fn staging_path(package: &Path) -> PathBuf {
    let mut name = package.file_name().unwrap_or_default().to_os_string();
    name.push(".stripped");
    package.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_package(path: &Path, entries: &[&str]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        for name in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(name.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    fn entry_names(path: &Path) -> Vec<String> {
        let archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut names: Vec<String> = archive.file_names().map(String::from).collect();
        names.sort();
        names
    }

    fn defaults() -> Vec<String> {
        DEFAULT_STRIPPED_ABIS.iter().map(|a| a.to_string()).collect()
    }

    #[tokio::test]
    async fn drops_only_listed_abis() {
        let dir = tempfile::tempdir().unwrap();
        let package = dir.path().join("demo.apk");
        write_package(
            &package,
            &[
                "AndroidManifest.xml",
                "lib/arm64-v8a/libapp.so",
                "lib/x86/libapp.so",
                "lib/x86_64/libapp.so",
            ],
        );

        assert_eq!(strip_abis(&package, &defaults()).await.unwrap(), 2);
        assert_eq!(
            entry_names(&package),
            vec!["AndroidManifest.xml", "lib/arm64-v8a/libapp.so"]
        );
        assert!(!staging_path(&package).exists());
    }

    #[tokio::test]
    async fn package_without_matches_is_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let package = dir.path().join("demo.apk");
        write_package(&package, &["classes.dex", "lib/armeabi-v7a/libapp.so"]);
        let before = std::fs::read(&package).unwrap();

        assert_eq!(strip_abis(&package, &defaults()).await.unwrap(), 0);
        assert_eq!(std::fs::read(&package).unwrap(), before);
    }

    #[tokio::test]
    async fn non_zip_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let package = dir.path().join("demo.apk");
        std::fs::write(&package, b"not a zip").unwrap();

        assert!(strip_abis(&package, &defaults()).await.is_err());
    }
}
