#[cfg(test)]
mod tests {
    use assert_cmd::Command;
    use predicates::prelude::*;

    fn command(dir: &std::path::Path) -> Command {
        let mut cmd = Command::cargo_bin("kodegen_bundler_apk").unwrap();
        cmd.current_dir(dir)
            .env_remove("APP_NAME")
            .env_remove("SOURCE")
            .env_remove("GITHUB_TOKEN")
            .env_remove("GH_TOKEN")
            .env_remove("GITHUB_REPOSITORY");
        cmd
    }

    #[test]
    fn test_help_lists_required_options() {
        let dir = tempfile::tempdir().unwrap();
        command(dir.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("--app-name"))
            .stdout(predicate::str::contains("--source"))
            .stdout(predicate::str::contains("--no-publish"));
    }

    #[test]
    fn test_missing_app_name_exits_one() {
        let dir = tempfile::tempdir().unwrap();
        command(dir.path())
            .env("SOURCE", "alpha")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("APP_NAME"));
    }

    #[test]
    fn test_empty_source_exits_one() {
        let dir = tempfile::tempdir().unwrap();
        command(dir.path())
            .env("APP_NAME", "demo")
            .env("SOURCE", "")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("SOURCE"));
    }

    #[test]
    fn test_missing_source_profile_exits_one() {
        let dir = tempfile::tempdir().unwrap();
        command(dir.path())
            .args(["--app-name", "demo", "--source", "alpha", "--no-publish"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("source profile not found"));
    }

    #[test]
    fn test_publishing_requires_repository() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sources")).unwrap();
        std::fs::write(
            dir.path().join("sources/alpha.json"),
            r#"[{"name": "alpha"}, {"user": "acme", "repo": "patcher"}]"#,
        )
        .unwrap();

        command(dir.path())
            .args(["--app-name", "demo", "--source", "alpha"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("GITHUB_TOKEN"));
    }
}
