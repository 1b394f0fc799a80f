//! Dependency scan pipeline
//!
//! Orchestrates one scan:
//! 1. Resolve registry metadata for every dependency (gated fan-out)
//! 2. Enrich with repository health (separately gated, time-boxed)
//! 3. Probe repositories that still lack health data (time-boxed)
//! 4. Score every package (synchronous, parallel across packages)
//!
//! Stages 2 and 3 stop waiting at their deadline. Work still in flight is
//! detached, not aborted; whatever it eventually produces is discarded.

mod host_sdk;

pub use host_sdk::{detect_dart_sdk, parse_dart_version_output, resolve_host_sdk};

use crate::cache::KeyedCache;
use crate::config::ScanConfig;
use crate::fetch::{
    http_client, ConcurrencyGate, ReachabilityProbe, RegistryFetcher, RepoHealthFetcher,
    RetryPolicy,
};
use crate::models::{DiagnosisResult, PackageMetadata, ProjectDiagnosis, TierCounts};
use crate::scoring::ScoringEngine;
use crate::signals::ScoringContext;
use anyhow::Result;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Per-request ceiling for registry and code-host calls
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Scanner {
    registry: Arc<RegistryFetcher>,
    repo_health: Arc<RepoHealthFetcher>,
    probe: Arc<ReachabilityProbe>,
    engine: ScoringEngine,
    repo_health_timeout: Duration,
    probe_timeout: Duration,
}

impl Scanner {
    pub fn new(
        registry: Arc<RegistryFetcher>,
        repo_health: Arc<RepoHealthFetcher>,
        probe: Arc<ReachabilityProbe>,
    ) -> Self {
        let defaults = ScanConfig::default();
        Self {
            registry,
            repo_health,
            probe,
            engine: ScoringEngine::new(),
            repo_health_timeout: defaults.repo_health_timeout,
            probe_timeout: defaults.probe_timeout,
        }
    }

    /// Wire fetchers, gates and cache from resolved configuration.
    pub fn from_config(config: &ScanConfig) -> Result<Self> {
        let client = http_client(HTTP_TIMEOUT)?;
        let cache = if config.no_cache {
            KeyedCache::disabled()
        } else {
            KeyedCache::new(&config.cache_dir)
        };
        let registry_gate = Arc::new(ConcurrencyGate::new("registry", config.concurrency));

        let registry = Arc::new(RegistryFetcher::new(
            client.clone(),
            &config.registry_url,
            cache.clone(),
            Arc::clone(&registry_gate),
            RetryPolicy::default(),
        ));
        let repo_health = Arc::new(RepoHealthFetcher::new(
            client.clone(),
            &config.github_api_url,
            config.github_token.clone(),
            cache.clone(),
            RetryPolicy::default(),
        ));
        let probe = Arc::new(ReachabilityProbe::new(
            client,
            cache,
            registry_gate,
            config.probe_request_timeout,
        ));

        Ok(Self::new(registry, repo_health, probe)
            .with_deadlines(config.repo_health_timeout, config.probe_timeout))
    }

    /// Override the repo-health and probe stage deadlines
    pub fn with_deadlines(mut self, repo_health: Duration, probe: Duration) -> Self {
        self.repo_health_timeout = repo_health;
        self.probe_timeout = probe;
        self
    }

    /// Scan a name -> resolved version map.
    pub async fn scan(
        &self,
        dependencies: &BTreeMap<String, String>,
        ctx: &ScoringContext,
    ) -> ProjectDiagnosis {
        info!("Scanning {} dependencies", dependencies.len());

        let (packages, unresolved) = self.registry.fetch_all(dependencies).await;
        if !unresolved.is_empty() {
            warn!(
                "{} dependencies could not be resolved: {}",
                unresolved.len(),
                unresolved.join(", ")
            );
        }

        let packages = self.augment_repo_health(packages).await;
        let packages = self.probe_repositories(packages).await;
        let results = self.score(&packages, ctx);
        let counts = TierCounts::from_results(&results);

        info!(
            "Scored {} packages: {} healthy, {} low, {} warning, {} risky, {} critical",
            counts.total, counts.healthy, counts.low, counts.warning, counts.risky, counts.critical
        );

        ProjectDiagnosis {
            results,
            counts,
            unresolved,
            host_sdk: ctx.host_sdk.as_ref().map(|v| v.to_string()),
            scanned_at: ctx.now,
        }
    }

    async fn augment_repo_health(&self, packages: Vec<PackageMetadata>) -> Vec<PackageMetadata> {
        let deadline = Instant::now() + self.repo_health_timeout;
        let mut set = JoinSet::new();
        for (idx, pkg) in packages.iter().enumerate() {
            if let Some(url) = pkg.repository_url.clone() {
                let fetcher = Arc::clone(&self.repo_health);
                set.spawn(async move { (idx, fetcher.fetch(&url).await) });
            }
        }

        let mut found = collect_until(set, deadline, "Repository health").await;
        debug!("Repository health resolved for {} packages", found.len());
        packages
            .into_iter()
            .enumerate()
            .map(|(idx, pkg)| match found.remove(&idx) {
                Some(health) => pkg.with_repo_health(health),
                None => pkg,
            })
            .collect()
    }

    async fn probe_repositories(&self, packages: Vec<PackageMetadata>) -> Vec<PackageMetadata> {
        let deadline = Instant::now() + self.probe_timeout;
        let mut set = JoinSet::new();
        for (idx, pkg) in packages.iter().enumerate() {
            if pkg.repo_health.is_some() {
                continue;
            }
            if let Some(url) = pkg.repository_url.clone() {
                let probe = Arc::clone(&self.probe);
                set.spawn(async move { (idx, probe.probe(&url).await) });
            }
        }
        if set.is_empty() {
            return packages;
        }

        let mut outcomes = collect_until(set, deadline, "Reachability probe").await;
        packages
            .into_iter()
            .enumerate()
            .map(|(idx, pkg)| match outcomes.remove(&idx) {
                Some(reachable) => pkg.with_reachability(Some(reachable)),
                None => pkg,
            })
            .collect()
    }

    /// Riskiest first, ties by name
    fn score(&self, packages: &[PackageMetadata], ctx: &ScoringContext) -> Vec<DiagnosisResult> {
        let mut results: Vec<DiagnosisResult> = packages
            .par_iter()
            .map(|pkg| self.engine.diagnose(pkg, ctx))
            .collect();
        results.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.package.cmp(&b.package))
        });
        results
    }
}

/// Gather `(key, Some(value))` outcomes until the set drains or the deadline
/// passes. Tasks still running at the deadline are detached.
pub async fn collect_until<V>(
    mut set: JoinSet<(usize, Option<V>)>,
    deadline: Instant,
    stage: &str,
) -> HashMap<usize, V>
where
    V: Send + 'static,
{
    let mut done = HashMap::new();
    loop {
        match tokio::time::timeout_at(deadline, set.join_next()).await {
            Ok(Some(Ok((idx, Some(value))))) => {
                done.insert(idx, value);
            }
            Ok(Some(Ok((_, None)))) => {}
            Ok(Some(Err(e))) => warn!("{} task failed: {}", stage, e),
            Ok(None) => break,
            Err(_) => {
                warn!(
                    "{} deadline reached; abandoning {} in-flight requests ({} completed)",
                    stage,
                    set.len(),
                    done.len()
                );
                set.detach_all();
                break;
            }
        }
    }
    done
}

/// Build a single-use runtime and drive `fut` to completion
pub fn block_on<F: Future>(fut: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(fut))
}
