//! CLI exit-code contract
//!
//! Only paths that need no network: manifest failures and an empty
//! dependency set.

use std::path::Path;
use std::process::Command;

fn deprisk_bin() -> &'static str {
    env!("CARGO_BIN_EXE_deprisk")
}

fn run(dir: &Path, extra_args: &[&str]) -> (i32, String, String) {
    let cache = dir.join(".deprisk-cache");
    let output = Command::new(deprisk_bin())
        .arg(dir)
        .args(["--sdk-version", "3.4.0"])
        .args(extra_args)
        .env("DEPRISK_CACHE_DIR", &cache)
        .env_remove("GITHUB_TOKEN")
        .env_remove("RUST_LOG")
        .output()
        .expect("run deprisk");
    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

const PUBSPEC: &str = "name: sample_app\nenvironment:\n  sdk: '>=3.0.0 <4.0.0'\n";

/// Only the SDK itself is locked; nothing hosted to fetch
const EMPTY_LOCK: &str = "\
packages:
  flutter:
    dependency: \"direct main\"
    description: flutter
    source: sdk
    version: \"0.0.0\"
sdks:
  dart: \">=3.0.0 <4.0.0\"
";

#[test]
fn test_missing_manifest_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, stderr) = run(dir.path(), &["--no-cache"]);
    assert_eq!(code, 2);
    assert!(stdout.is_empty());
    assert!(stderr.contains("pubspec.yaml"), "stderr: {}", stderr);
    assert_eq!(stderr.trim().lines().count(), 1, "stderr: {}", stderr);
}

#[test]
fn test_missing_lockfile_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("pubspec.yaml"), PUBSPEC).unwrap();
    let (code, _, stderr) = run(dir.path(), &["--no-cache"]);
    assert_eq!(code, 2);
    assert!(stderr.contains("pubspec.lock"), "stderr: {}", stderr);
}

#[test]
fn test_lockfile_without_packages_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("pubspec.yaml"), PUBSPEC).unwrap();
    std::fs::write(dir.path().join("pubspec.lock"), "sdks:\n  dart: \">=3.0.0 <4.0.0\"\n").unwrap();
    let (code, _, _) = run(dir.path(), &["--no-cache"]);
    assert_eq!(code, 2);
}

#[test]
fn test_empty_dependency_set_succeeds_as_json() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("pubspec.yaml"), PUBSPEC).unwrap();
    std::fs::write(dir.path().join("pubspec.lock"), EMPTY_LOCK).unwrap();

    let (code, stdout, stderr) = run(
        dir.path(),
        &["--no-cache", "--format", "json", "--fail-on", "healthy"],
    );
    assert_eq!(code, 0, "stderr: {}", stderr);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["counts"]["total"], 0);
    assert_eq!(parsed["host_sdk"], "3.4.0");
}

#[test]
fn test_bad_flags_are_rejected_by_parser() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, _) = run(dir.path(), &["--concurrency", "0"]);
    assert_eq!(code, 2);
    let (code, _, _) = run(dir.path(), &["--fail-on", "severe"]);
    assert_eq!(code, 2);
}

#[test]
fn test_clear_cache_runs_before_manifest_check() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run(dir.path(), &["--clear-cache"]);
    assert_eq!(code, 2);
    assert!(stderr.contains("Cleared 0 cached responses"), "stderr: {}", stderr);
}
