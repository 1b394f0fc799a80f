//! pub.dev registry client
//!
//! Two lookups per package (`/packages/{name}` then `/packages/{name}/score`)
//! merged into one cached blob and parsed into [`PackageMetadata`].

use super::{send_json, ConcurrencyGate, FetchError, Lookup, RetryPolicy};
use crate::cache::{KeyedCache, PACKAGE_TTL};
use crate::models::{PackageMetadata, Release, VerificationTier};
use crate::signals::safety::infer_safety_opt_in;
use crate::version::{is_prerelease, parse_version};
use chrono::{DateTime, TimeZone, Utc};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

const PUBLISHER_TAG: &str = "publisher:";
const FAVORITE_TAG: &str = "is:flutter-favorite";
const NULL_SAFE_TAG: &str = "is:null-safe";

pub struct RegistryFetcher {
    client: reqwest::Client,
    base_url: String,
    cache: KeyedCache,
    gate: Arc<ConcurrencyGate>,
    retry: RetryPolicy,
}

impl RegistryFetcher {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        cache: KeyedCache,
        gate: Arc<ConcurrencyGate>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache,
            gate,
            retry,
        }
    }

    /// Admission control shared with the reachability probe
    pub fn gate(&self) -> Arc<ConcurrencyGate> {
        Arc::clone(&self.gate)
    }

    /// Resolve one package; `None` when the registry cannot supply it.
    ///
    /// A fresh blob is cached only when it parses and both lookups got a
    /// definitive answer.
    pub async fn fetch(&self, name: &str, current_version: &str) -> Option<PackageMetadata> {
        let key = format!("pub:package:{}", name);
        if let Some(blob) = self.cache.get(&key) {
            if let Some(meta) = parse_package(name, current_version, &blob, true) {
                return Some(meta);
            }
            debug!("Cached registry data for {} is unusable, refetching", name);
        }

        let (blob, complete) = self.fetch_blob(name).await?;
        let Some(meta) = parse_package(name, current_version, &blob, false) else {
            warn!("Registry data for {} is unusable, skipping", name);
            return None;
        };
        if complete {
            if let Err(e) = self.cache.set(&key, &blob, PACKAGE_TTL) {
                warn!("Failed to cache registry data for {}: {}", name, e);
            }
        } else {
            debug!("Score lookup for {} did not settle; not caching", name);
        }
        Some(meta)
    }

    /// Fetch every dependency with full fan-out bounded only by the gate.
    ///
    /// Returns resolved metadata (sorted by name) and the names that could
    /// not be resolved.
    pub async fn fetch_all(
        self: &Arc<Self>,
        deps: &BTreeMap<String, String>,
    ) -> (Vec<PackageMetadata>, Vec<String>) {
        let mut set = JoinSet::new();
        for (name, version) in deps {
            let this = Arc::clone(self);
            let name = name.clone();
            let version = version.clone();
            set.spawn(async move {
                let meta = this.fetch(&name, &version).await;
                (name, meta)
            });
        }

        let mut resolved = Vec::new();
        let mut unresolved = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((_, Some(meta))) => resolved.push(meta),
                Ok((name, None)) => unresolved.push(name),
                Err(e) => warn!("Registry task failed: {}", e),
            }
        }
        // Anything whose task died is unresolved as well
        let seen: HashSet<&str> = resolved
            .iter()
            .map(|m| m.name.as_str())
            .chain(unresolved.iter().map(String::as_str))
            .collect();
        let missing: Vec<String> = deps
            .keys()
            .filter(|n| !seen.contains(n.as_str()))
            .cloned()
            .collect();
        unresolved.extend(missing);

        resolved.sort_by(|a, b| a.name.cmp(&b.name));
        unresolved.sort();
        (resolved, unresolved)
    }

    /// Merged `{package, score, fetchedAt}` blob, plus whether every part
    /// of it is a definitive upstream answer
    async fn fetch_blob(&self, name: &str) -> Option<(Value, bool)> {
        let package = self
            .get_json(&format!("packages/{}", name), name)
            .await
            .found()?;
        // The score is optional; its absence only degrades one signal
        let score = self
            .get_json(&format!("packages/{}/score", name), name)
            .await;
        let complete = score.is_definitive();

        let blob = json!({
            "package": package,
            "score": score.found().unwrap_or(Value::Null),
            "fetchedAt": Utc::now().timestamp_millis(),
        });
        Some((blob, complete))
    }

    /// GET `{base}/{path}` through gate and retry
    async fn get_json(&self, path: &str, name: &str) -> Lookup<Value> {
        let url = format!("{}/{}", self.base_url, path);
        let label = format!("registry {}", path);
        let outcome = self
            .retry
            .run(&label, || {
                let request = self.client.get(&url);
                let url = &url;
                async move {
                    let _permit = self.gate.acquire().await;
                    let response = send_json(request).await?;
                    match response.status {
                        s if s.is_success() => Ok(response.body),
                        StatusCode::NOT_FOUND => Ok(None),
                        StatusCode::TOO_MANY_REQUESTS => {
                            warn!("Registry rate limit hit for {}", name);
                            Err(FetchError::RateLimited(url.clone()))
                        }
                        s => Err(FetchError::Transient(format!("{} returned {}", url, s))),
                    }
                }
            })
            .await;

        let lookup = Lookup::from_retry(outcome);
        if matches!(lookup, Lookup::Absent) {
            debug!("Registry has no {}", path);
        }
        lookup
    }
}

/// Parse a merged registry blob. `None` if the blob lacks the minimum needed
/// to score the package (no version information at all).
pub fn parse_package(
    name: &str,
    current_version: &str,
    blob: &Value,
    from_cache: bool,
) -> Option<PackageMetadata> {
    let package = blob.get("package").filter(|p| p.is_object())?;
    let score = blob.get("score").filter(|s| s.is_object());

    let releases = parse_releases(package);
    let registry_latest = package
        .pointer("/latest/version")
        .and_then(Value::as_str)
        .map(str::to_string);

    let latest_version = releases
        .first()
        .map(|r| r.version.clone())
        .or_else(|| registry_latest.clone());
    latest_version.as_ref()?;

    let latest_stable_version = registry_latest
        .clone()
        .filter(|v| parse_version(v).is_some_and(|v| !is_prerelease(&v)))
        .or_else(|| {
            releases
                .iter()
                .find(|r| parse_version(&r.version).is_some_and(|v| !is_prerelease(&v)))
                .map(|r| r.version.clone())
        });

    // Pubspec of the version in use, else of the latest release
    let pubspec = package
        .get("versions")
        .and_then(Value::as_array)
        .and_then(|versions| {
            versions
                .iter()
                .find(|v| v.get("version").and_then(Value::as_str) == Some(current_version))
        })
        .and_then(|v| v.get("pubspec"))
        .or_else(|| package.pointer("/latest/pubspec"));

    let str_field = |key: &str| -> Option<String> {
        pubspec
            .and_then(|p| p.get(key))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let repository_url = str_field("repository")
        .and_then(|u| normalize_url(&u))
        .or_else(|| {
            str_field("homepage")
                .and_then(|u| normalize_url(&u))
                .filter(|u| is_github_url(u))
        });
    let issue_tracker_url = str_field("issue_tracker").and_then(|u| normalize_url(&u));
    let sdk_constraint = pubspec
        .and_then(|p| p.pointer("/environment/sdk"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let tags: Vec<&str> = score
        .and_then(|s| s.get("tags"))
        .and_then(Value::as_array)
        .map(|tags| tags.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let publisher = tags
        .iter()
        .find_map(|t| t.strip_prefix(PUBLISHER_TAG))
        .map(str::to_string);
    let favorite = tags.contains(&FAVORITE_TAG);

    let safety_opt_in = if tags.contains(&NULL_SAFE_TAG) {
        Some(true)
    } else {
        sdk_constraint.as_deref().and_then(infer_safety_opt_in)
    };

    let registry_score = score.and_then(|s| {
        let granted = s.get("grantedPoints")?.as_f64()?;
        let max = s.get("maxPoints")?.as_f64()?;
        (max > 0.0).then(|| (granted / max * 100.0).clamp(0.0, 100.0))
    });
    let popularity = score
        .and_then(|s| s.get("popularityScore"))
        .and_then(Value::as_f64)
        .map(|p| (p * 100.0).clamp(0.0, 100.0));
    let like_count = score.and_then(|s| s.get("likeCount")).and_then(Value::as_u64);

    let fetched_at = blob
        .get("fetchedAt")
        .and_then(Value::as_i64)
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .unwrap_or_else(Utc::now);

    Some(PackageMetadata {
        name: name.to_string(),
        current_version: current_version.to_string(),
        latest_version,
        latest_stable_version,
        repository_url,
        issue_tracker_url,
        registry_score,
        popularity,
        like_count,
        sdk_constraint,
        safety_opt_in,
        discontinued: package
            .get("isDiscontinued")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        replaced_by: package
            .get("replacedBy")
            .and_then(Value::as_str)
            .map(str::to_string),
        releases,
        verification: VerificationTier::from_flags(publisher.is_some(), favorite),
        publisher,
        repo_health: None,
        repository_reachable: None,
        fetched_at,
        from_cache,
    })
}

/// Release history, newest first, deduplicated by version
fn parse_releases(package: &Value) -> Vec<Release> {
    let Some(versions) = package.get("versions").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut releases: Vec<Release> = versions
        .iter()
        .filter_map(|v| {
            let version = v.get("version")?.as_str()?;
            let published = v.get("published")?.as_str()?;
            let published = DateTime::parse_from_rfc3339(published)
                .ok()?
                .with_timezone(&Utc);
            Some(Release {
                version: version.to_string(),
                published,
            })
        })
        .filter(|r| seen.insert(r.version.clone()))
        .collect();

    releases.sort_by(|a, b| b.published.cmp(&a.published));
    releases
}

/// Accept only absolute http(s) URLs; anything else is dropped
fn normalize_url(raw: &str) -> Option<String> {
    let parsed = url::Url::parse(raw).ok()?;
    matches!(parsed.scheme(), "http" | "https").then(|| raw.to_string())
}

fn is_github_url(raw: &str) -> bool {
    url::Url::parse(raw)
        .ok()
        .and_then(|u| u.host_str().map(super::repo_health::is_github_host))
        .unwrap_or(false)
}
