//! CLI definition and the scan run loop

use crate::cache::KeyedCache;
use crate::config::{ConfigLayer, ScanConfig};
use crate::manifest;
use crate::models::{ProjectDiagnosis, RiskTier};
use crate::pipeline::{self, detect_dart_sdk, resolve_host_sdk, Scanner};
use crate::reporters;
use crate::signals::ScoringContext;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

/// Exit code when `--fail-on` trips
const EXIT_THRESHOLD: u8 = 1;

/// Parse and validate the registry concurrency (1-64)
fn parse_concurrency(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("concurrency must be at least 1".to_string())
    } else if n > crate::config::MAX_CONCURRENCY {
        Err(format!(
            "concurrency cannot exceed {}",
            crate::config::MAX_CONCURRENCY
        ))
    } else {
        Ok(n)
    }
}

/// deprisk - dependency risk scoring for Dart and Flutter projects
#[derive(Parser, Debug)]
#[command(name = "deprisk")]
#[command(
    version,
    about = "Score the health and risk of a Dart/Flutter project's pub dependencies",
    long_about = "deprisk reads pubspec.yaml and pubspec.lock, pulls registry metadata from \
pub.dev and repository health from GitHub, and scores every dependency from 0 (healthy) \
to 100 (critical) across ten weighted signals.",
    after_help = "\
Examples:
  deprisk                              Scan the current directory
  deprisk app/ --format json           JSON output for scripting
  deprisk --transitive --fail-on risky Include transitive deps, fail CI on risky+
  deprisk --sdk-version 3.4.0          Score SDK compatibility against 3.4.0"
)]
pub struct Cli {
    /// Path to the project (directory holding pubspec.yaml)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Output format
    #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Write the report to a file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Concurrent registry requests (1-64)
    #[arg(long, value_parser = parse_concurrency)]
    pub concurrency: Option<usize>,

    /// Host Dart SDK version to check constraints against
    #[arg(long)]
    pub sdk_version: Option<String>,

    /// GitHub token for repository health requests
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Skip the response cache for this run
    #[arg(long)]
    pub no_cache: bool,

    /// Delete cached responses before scanning
    #[arg(long)]
    pub clear_cache: bool,

    /// Score transitive dependencies too
    #[arg(long)]
    pub transitive: bool,

    /// Exit with code 1 if any package reaches this tier or worse
    #[arg(long, value_parser = ["healthy", "low", "warning", "risky", "critical"])]
    pub fail_on: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,
}

impl Cli {
    /// Flags are the highest-priority configuration layer
    fn config_layer(&self) -> ConfigLayer {
        ConfigLayer {
            github_token: self.github_token.clone(),
            concurrency: self.concurrency,
            no_cache: self.no_cache.then_some(true),
            sdk_version: self.sdk_version.clone(),
            include_transitive: self.transitive.then_some(true),
            ..Default::default()
        }
    }
}

/// Run a scan; `Err` carrying a `ManifestError` maps to exit code 2 in main
pub fn run(cli: Cli) -> Result<ExitCode> {
    let config = ScanConfig::load(&cli.path).with_layer(cli.config_layer());

    if cli.clear_cache {
        let removed = KeyedCache::new(&config.cache_dir)
            .clear()
            .with_context(|| format!("Failed to clear cache at {}", config.cache_dir.display()))?;
        eprintln!("Cleared {} cached responses", removed);
    }

    let deps = manifest::load(&cli.path, config.include_transitive)?;
    info!(
        "Loaded {} dependencies for {}",
        deps.dependencies.len(),
        deps.project
    );

    let host_sdk = resolve_host_sdk(
        config.sdk_version.as_deref(),
        deps.sdk_constraint.as_deref(),
        detect_dart_sdk,
    );
    let ctx = ScoringContext::new(chrono::Utc::now(), host_sdk);

    let scanner = Scanner::from_config(&config)?;
    let diagnosis = pipeline::block_on(scanner.scan(&deps.dependencies, &ctx))?;

    let rendered = reporters::report(&diagnosis, &cli.format)?;
    match &cli.output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            eprintln!("Report written to {}", path.display());
        }
        None => println!("{}", rendered),
    }

    if check_fail_threshold(&cli.fail_on, &diagnosis)? {
        return Ok(ExitCode::from(EXIT_THRESHOLD));
    }
    Ok(ExitCode::SUCCESS)
}

/// True when some package reaches the `--fail-on` tier or worse
fn check_fail_threshold(fail_on: &Option<String>, diagnosis: &ProjectDiagnosis) -> Result<bool> {
    if let Some(ref threshold) = fail_on {
        let tier: RiskTier = threshold.parse()?;
        if diagnosis.worst_tier().is_some_and(|worst| worst >= tier) {
            eprintln!("Failing due to --fail-on={} threshold", threshold);
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::test_diagnosis;

    #[test]
    fn test_parse_concurrency_bounds() {
        assert_eq!(parse_concurrency("8"), Ok(8));
        assert_eq!(parse_concurrency("64"), Ok(64));
        assert!(parse_concurrency("0").is_err());
        assert!(parse_concurrency("65").is_err());
        assert!(parse_concurrency("many").is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["deprisk"]).unwrap();
        assert_eq!(cli.path, PathBuf::from("."));
        assert_eq!(cli.format, "text");
        assert_eq!(cli.log_level, "warn");
        assert!(cli.fail_on.is_none());
        let layer = cli.config_layer();
        assert!(layer.no_cache.is_none());
        assert!(layer.include_transitive.is_none());
    }

    #[test]
    fn test_cli_flags_become_config_layer() {
        let cli = Cli::try_parse_from([
            "deprisk",
            "app",
            "--format",
            "json",
            "--concurrency",
            "3",
            "--sdk-version",
            "3.4.0",
            "--no-cache",
            "--transitive",
            "--fail-on",
            "risky",
        ])
        .unwrap();
        assert_eq!(cli.path, PathBuf::from("app"));
        let config = ScanConfig::default().with_layer(cli.config_layer());
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.sdk_version.as_deref(), Some("3.4.0"));
        assert!(config.no_cache);
        assert!(config.include_transitive);
    }

    #[test]
    fn test_cli_rejects_unknown_tier() {
        assert!(Cli::try_parse_from(["deprisk", "--fail-on", "severe"]).is_err());
        assert!(Cli::try_parse_from(["deprisk", "--format", "sarif"]).is_err());
    }

    #[test]
    fn test_fail_threshold() {
        let d = test_diagnosis();
        assert!(!check_fail_threshold(&None, &d).unwrap());
        assert!(check_fail_threshold(&Some("risky".into()), &d).unwrap());
        assert!(check_fail_threshold(&Some("warning".into()), &d).unwrap());
        assert!(!check_fail_threshold(&Some("critical".into()), &d).unwrap());
    }
}
