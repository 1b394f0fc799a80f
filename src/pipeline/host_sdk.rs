//! Host SDK version resolution
//!
//! Order: explicit override, then `dart --version`, then the lower bound of
//! the project's own SDK constraint. `None` leaves the SDK signal failed.

use crate::version::{parse_version, VersionConstraint};
use semver::Version;
use std::process::Command;
use tracing::{debug, warn};

pub fn resolve_host_sdk(
    explicit: Option<&str>,
    project_constraint: Option<&str>,
    detect: impl FnOnce() -> Option<Version>,
) -> Option<Version> {
    if let Some(raw) = explicit {
        match parse_version(raw) {
            Some(v) => return Some(v),
            None => warn!("Ignoring unparseable SDK version {:?}", raw),
        }
    }

    if let Some(v) = detect() {
        debug!("Detected host SDK {}", v);
        return Some(v);
    }

    let lower = project_constraint
        .and_then(|c| c.parse::<VersionConstraint>().ok())
        .and_then(|c| c.lower().cloned());
    if let Some(v) = &lower {
        debug!("Using project SDK lower bound {} as host SDK", v);
    }
    lower
}

/// Ask the installed `dart` binary; failures are ignored
pub fn detect_dart_sdk() -> Option<Version> {
    let output = Command::new("dart").arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    // Older SDKs print the banner on stderr
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    parse_dart_version_output(&stdout).or_else(|| parse_dart_version_output(&stderr))
}

/// Parse `Dart SDK version: 3.4.0 (stable) (...) on "linux_x64"`
pub fn parse_dart_version_output(output: &str) -> Option<Version> {
    let rest = output.split("version:").nth(1)?;
    let token = rest.split_whitespace().next()?;
    parse_version(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dart_banner() {
        let banner = r#"Dart SDK version: 3.4.3 (stable) (Tue Jun 4 19:51:39 2024 +0000) on "macos_arm64""#;
        assert_eq!(parse_dart_version_output(banner), Version::parse("3.4.3").ok());
        let beta = "Dart SDK version: 3.5.0-180.3.beta (beta)";
        assert_eq!(
            parse_dart_version_output(beta),
            Version::parse("3.5.0-180.3.beta").ok()
        );
        assert_eq!(parse_dart_version_output("command not found"), None);
    }

    #[test]
    fn test_resolution_order() {
        let detected = || Version::parse("3.4.0").ok();
        let none = || None;

        assert_eq!(
            resolve_host_sdk(Some("3.1.0"), Some("^2.19.0"), detected),
            Version::parse("3.1.0").ok()
        );
        assert_eq!(
            resolve_host_sdk(None, Some("^2.19.0"), detected),
            Version::parse("3.4.0").ok()
        );
        assert_eq!(
            resolve_host_sdk(None, Some(">=2.19.0 <4.0.0"), none),
            Version::parse("2.19.0").ok()
        );
        assert_eq!(resolve_host_sdk(Some("garbage"), None, none), None);
    }
}
