//! File-level configuration layers
//!
//! Supports loading config from:
//! - ~/.config/deprisk/config.toml (user)
//! - deprisk.toml in the project root (project)
//!
//! Every field is optional; a layer only overrides what it sets.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const PROJECT_CONFIG_FILE: &str = "deprisk.toml";

#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfigLayer {
    pub registry_url: Option<String>,
    pub github_api_url: Option<String>,
    /// Bearer credential for the GitHub API
    pub github_token: Option<String>,
    /// Registry gate capacity
    pub concurrency: Option<usize>,
    pub repo_health_timeout_secs: Option<u64>,
    pub probe_timeout_secs: Option<u64>,
    pub probe_request_timeout_secs: Option<u64>,
    pub cache_dir: Option<PathBuf>,
    pub no_cache: Option<bool>,
    /// Host SDK version override
    pub sdk_version: Option<String>,
    pub include_transitive: Option<bool>,
}

impl ConfigLayer {
    /// Get the user config file path
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("deprisk").join("config.toml"))
    }

    /// User-level layer; empty when absent or unreadable
    pub fn load_user() -> Self {
        Self::user_config_path()
            .map(|p| Self::load_file(&p))
            .unwrap_or_default()
    }

    /// Project-level layer from `deprisk.toml`
    pub fn load_project(project_dir: &Path) -> Self {
        Self::load_file(&project_dir.join(PROJECT_CONFIG_FILE))
    }

    /// Parse one TOML file. Missing files are silent; broken ones warn.
    pub fn load_file(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        let parsed = std::fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|content| toml::from_str::<ConfigLayer>(&content).map_err(Into::into));
        match parsed {
            Ok(layer) => {
                debug!("Loaded config from {}", path.display());
                layer
            }
            Err(e) => {
                warn!("Failed to load {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Merge another layer into this one (other takes priority)
    pub fn merge(&mut self, other: ConfigLayer) {
        if other.registry_url.is_some() {
            self.registry_url = other.registry_url;
        }
        if other.github_api_url.is_some() {
            self.github_api_url = other.github_api_url;
        }
        if other.github_token.is_some() {
            self.github_token = other.github_token;
        }
        if other.concurrency.is_some() {
            self.concurrency = other.concurrency;
        }
        if other.repo_health_timeout_secs.is_some() {
            self.repo_health_timeout_secs = other.repo_health_timeout_secs;
        }
        if other.probe_timeout_secs.is_some() {
            self.probe_timeout_secs = other.probe_timeout_secs;
        }
        if other.probe_request_timeout_secs.is_some() {
            self.probe_request_timeout_secs = other.probe_request_timeout_secs;
        }
        if other.cache_dir.is_some() {
            self.cache_dir = other.cache_dir;
        }
        if other.no_cache.is_some() {
            self.no_cache = other.no_cache;
        }
        if other.sdk_version.is_some() {
            self.sdk_version = other.sdk_version;
        }
        if other.include_transitive.is_some() {
            self.include_transitive = other.include_transitive;
        }
    }
}
