//! Configuration module for deprisk
//!
//! Sources, lowest to highest priority:
//! 1. Built-in defaults
//! 2. User config (~/.config/deprisk/config.toml)
//! 3. Project config (deprisk.toml)
//! 4. Environment (GITHUB_TOKEN, DEPRISK_CACHE_DIR)
//! 5. CLI flags (applied by the caller)

mod user_config;

pub use user_config::{ConfigLayer, PROJECT_CONFIG_FILE};

use crate::cache::default_cache_dir;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_REGISTRY_URL: &str = "https://pub.dev/api";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_CONCURRENCY: usize = 8;
pub const MAX_CONCURRENCY: usize = 64;

/// Fully resolved settings for one scan
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    pub registry_url: String,
    pub github_api_url: String,
    pub github_token: Option<String>,
    /// Registry gate capacity, 1..=64
    pub concurrency: usize,
    /// Deadline of the whole repo-health stage
    pub repo_health_timeout: Duration,
    /// Deadline of the whole reachability stage
    pub probe_timeout: Duration,
    /// Per-request timeout of one probe
    pub probe_request_timeout: Duration,
    pub cache_dir: PathBuf,
    pub no_cache: bool,
    pub sdk_version: Option<String>,
    pub include_transitive: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            github_token: None,
            concurrency: DEFAULT_CONCURRENCY,
            repo_health_timeout: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(10),
            probe_request_timeout: Duration::from_secs(5),
            cache_dir: default_cache_dir(),
            no_cache: false,
            sdk_version: None,
            include_transitive: false,
        }
    }
}

impl ScanConfig {
    /// Defaults, then user file, project file and environment.
    pub fn load(project_dir: &Path) -> Self {
        let mut layer = ConfigLayer::load_user();
        layer.merge(ConfigLayer::load_project(project_dir));
        layer.merge(env_layer(|key| std::env::var(key).ok()));
        Self::default().with_layer(layer)
    }

    /// Apply one layer on top of this config
    pub fn with_layer(mut self, layer: ConfigLayer) -> Self {
        if let Some(url) = layer.registry_url {
            self.registry_url = url;
        }
        if let Some(url) = layer.github_api_url {
            self.github_api_url = url;
        }
        if let Some(token) = layer.github_token.filter(|t| !t.trim().is_empty()) {
            self.github_token = Some(token);
        }
        if let Some(n) = layer.concurrency {
            self.concurrency = n;
        }
        if let Some(secs) = layer.repo_health_timeout_secs {
            self.repo_health_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = layer.probe_timeout_secs {
            self.probe_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = layer.probe_request_timeout_secs {
            self.probe_request_timeout = Duration::from_secs(secs);
        }
        if let Some(dir) = layer.cache_dir {
            self.cache_dir = dir;
        }
        if let Some(no_cache) = layer.no_cache {
            self.no_cache = no_cache;
        }
        if let Some(sdk) = layer.sdk_version {
            self.sdk_version = Some(sdk);
        }
        if let Some(transitive) = layer.include_transitive {
            self.include_transitive = transitive;
        }
        self.concurrency = self.concurrency.clamp(1, MAX_CONCURRENCY);
        self
    }
}

/// Environment overrides
fn env_layer(var: impl Fn(&str) -> Option<String>) -> ConfigLayer {
    ConfigLayer {
        github_token: var("GITHUB_TOKEN"),
        cache_dir: var("DEPRISK_CACHE_DIR")
            .filter(|d| !d.is_empty())
            .map(PathBuf::from),
        ..Default::default()
    }
}
