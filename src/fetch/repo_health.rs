//! GitHub repository health client
//!
//! One repository costs four sub-requests (summary, latest commit, recent
//! closed issues, contributor page). They run in parallel once the repository
//! has been admitted through the outer gate.

use super::{send_json, ConcurrencyGate, FetchError, Lookup, RetryPolicy};
use crate::cache::{KeyedCache, REPO_HEALTH_TTL};
use crate::models::RepoHealth;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, LINK};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Fixed capacity of the code-host gate
pub const GITHUB_GATE_CAPACITY: usize = 4;
/// Closed issues sampled for latency and resolution
pub const ISSUE_PAGE_SIZE: usize = 100;

const GITHUB_ACCEPT: &str = "application/vnd.github+json";

pub fn is_github_host(host: &str) -> bool {
    matches!(host.to_ascii_lowercase().as_str(), "github.com" | "www.github.com")
}

/// Extract `(owner, repo)` from a GitHub URL; `None` for other hosts
pub fn parse_repo_slug(repository_url: &str) -> Option<(String, String)> {
    let parsed = url::Url::parse(repository_url.trim()).ok()?;
    if !is_github_host(parsed.host_str()?) {
        return None;
    }
    let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());
    let owner = segments.next()?;
    let repo = segments.next()?;
    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    if repo.is_empty() {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

/// Page number of the `rel="last"` entry in a `Link` header
pub fn last_page_from_link(link: &str) -> Option<u64> {
    link.split(',')
        .find(|part| part.contains("rel=\"last\""))
        .and_then(|part| {
            let url = part.split(';').next()?.trim();
            let url = url.trim_start_matches('<').trim_end_matches('>');
            url::Url::parse(url)
                .ok()?
                .query_pairs()
                .find(|(k, _)| k == "page")
                .and_then(|(_, v)| v.parse().ok())
        })
}

/// Body and headers of one successful sub-request
struct Page {
    body: Value,
    headers: HeaderMap,
}

pub struct RepoHealthFetcher {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
    cache: KeyedCache,
    gate: ConcurrencyGate,
    retry: RetryPolicy,
    budget_exhausted: AtomicBool,
}

impl RepoHealthFetcher {
    pub fn new(
        client: reqwest::Client,
        api_url: impl Into<String>,
        token: Option<String>,
        cache: KeyedCache,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
            cache,
            gate: ConcurrencyGate::new("github", GITHUB_GATE_CAPACITY),
            retry,
            budget_exhausted: AtomicBool::new(false),
        }
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    /// True once the code host has rejected us for rate reasons
    pub fn budget_exhausted(&self) -> bool {
        self.budget_exhausted.load(Ordering::SeqCst)
    }

    /// Resolve health for a repository URL; `None` for unknown hosts,
    /// missing repositories, or an exhausted API budget.
    pub async fn fetch(&self, repository_url: &str) -> Option<RepoHealth> {
        let (owner, repo) = parse_repo_slug(repository_url)?;
        let key = format!(
            "gh:repo:{}/{}",
            owner.to_ascii_lowercase(),
            repo.to_ascii_lowercase()
        );

        if let Some(blob) = self.cache.get(&key) {
            return parse_repo_health(&blob);
        }
        if self.budget_exhausted() {
            debug!("GitHub budget exhausted, skipping {}/{}", owner, repo);
            return None;
        }

        let _permit = self.gate.acquire().await;
        let base = format!("repos/{}/{}", owner, repo);
        let issues_path = format!(
            "{}/issues?state=closed&per_page={}&sort=updated",
            base, ISSUE_PAGE_SIZE
        );
        let commits_path = format!("{}/commits?per_page=1", base);
        let contributors_path = format!("{}/contributors?per_page=1&anon=false", base);
        let (summary, commits, issues, contributors) = tokio::join!(
            self.get(&base),
            self.get(&commits_path),
            self.get(&issues_path),
            self.get(&contributors_path),
        );

        let complete = [
            summary.is_definitive(),
            commits.is_definitive(),
            issues.is_definitive(),
            contributors.is_definitive(),
        ]
        .iter()
        .all(|settled| *settled);

        let summary = summary.found()?;
        let contributor_count = contributors.found().and_then(|page| {
            page.headers
                .get(LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(last_page_from_link)
                .or_else(|| page.body.as_array().map(|a| a.len() as u64))
        });

        let blob = json!({
            "repo": summary.body,
            "commits": commits.found().map(|p| p.body).unwrap_or(Value::Null),
            "issues": issues.found().map(|p| p.body).unwrap_or(Value::Null),
            "contributors": contributor_count,
        });
        let health = parse_repo_health(&blob)?;
        if complete {
            if let Err(e) = self.cache.set(&key, &blob, REPO_HEALTH_TTL) {
                warn!("Failed to cache repo health for {}/{}: {}", owner, repo, e);
            }
        } else {
            debug!("Repo health for {}/{} is partial; not caching", owner, repo);
        }
        Some(health)
    }

    /// One sub-request. 404/409 are definitive misses; rate-limit rejections
    /// and a spent budget are not.
    async fn get(&self, path: &str) -> Lookup<Page> {
        let url = format!("{}/{}", self.api_url, path);
        let label = format!("github {}", path);
        let outcome = self
            .retry
            .run(&label, || {
                let request = self.request(&url);
                async move {
                    if self.budget_exhausted() {
                        return Ok(Lookup::GaveUp);
                    }
                    let response = send_json(request).await?;
                    match response.status {
                        s if s.is_success() => Ok(match response.body {
                            Some(body) => Lookup::Found(Page {
                                body,
                                headers: response.headers,
                            }),
                            None => Lookup::Absent,
                        }),
                        // 409: empty repository has no commits
                        StatusCode::NOT_FOUND | StatusCode::CONFLICT => Ok(Lookup::Absent),
                        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
                            if !self.budget_exhausted.swap(true, Ordering::SeqCst) {
                                warn!(
                                    "GitHub rate limit reached ({}); repository health disabled for the rest of this scan. Set GITHUB_TOKEN to raise the limit.",
                                    response.status
                                );
                            }
                            Ok(Lookup::GaveUp)
                        }
                        s => Err(FetchError::Transient(format!("{} returned {}", path, s))),
                    }
                }
            })
            .await;
        outcome.unwrap_or(Lookup::GaveUp)
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(url).header(ACCEPT, GITHUB_ACCEPT);
        match &self.token {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => request,
        }
    }
}

/// Parse a merged `{repo, commits, issues, contributors}` blob.
///
/// The repository summary is mandatory; every other part is optional.
pub fn parse_repo_health(blob: &Value) -> Option<RepoHealth> {
    let repo = blob.get("repo").filter(|r| r.is_object())?;

    let last_commit = blob
        .get("commits")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .and_then(|c| {
            c.pointer("/commit/committer/date")
                .or_else(|| c.pointer("/commit/author/date"))
        })
        .and_then(Value::as_str)
        .and_then(parse_timestamp);

    let (closed_issues, avg_issue_close_days) = match blob.get("issues").and_then(Value::as_array)
    {
        Some(issues) => {
            let closed: Vec<&Value> = issues
                .iter()
                .filter(|i| i.get("pull_request").is_none())
                .collect();
            (Some(closed.len() as u64), mean_close_days(&closed))
        }
        None => (None, None),
    };

    Some(RepoHealth {
        open_issues: repo.get("open_issues_count").and_then(Value::as_u64),
        closed_issues,
        stars: repo
            .get("stargazers_count")
            .and_then(Value::as_u64)
            .unwrap_or(0),
        forks: repo.get("forks_count").and_then(Value::as_u64).unwrap_or(0),
        contributors: blob.get("contributors").and_then(Value::as_u64),
        avg_issue_close_days,
        last_commit,
        archived: repo.get("archived").and_then(Value::as_bool).unwrap_or(false),
    })
}

/// Mean of `closed_at - created_at` in days, from hour-granularity deltas
fn mean_close_days(issues: &[&Value]) -> Option<f64> {
    let hours: Vec<i64> = issues
        .iter()
        .filter_map(|issue| {
            let created = parse_timestamp(issue.get("created_at")?.as_str()?)?;
            let closed = parse_timestamp(issue.get("closed_at")?.as_str()?)?;
            Some((closed - created).num_hours().max(0))
        })
        .collect();
    if hours.is_empty() {
        return None;
    }
    let mean_hours = hours.iter().sum::<i64>() as f64 / hours.len() as f64;
    Some(mean_hours / 24.0)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repo_slug() {
        assert_eq!(
            parse_repo_slug("https://github.com/dart-lang/http"),
            Some(("dart-lang".into(), "http".into()))
        );
        assert_eq!(
            parse_repo_slug("https://www.github.com/flutter/packages/tree/main/packages/camera"),
            Some(("flutter".into(), "packages".into()))
        );
        assert_eq!(
            parse_repo_slug("https://github.com/foo/bar.git/"),
            Some(("foo".into(), "bar".into()))
        );
        assert_eq!(parse_repo_slug("https://gitlab.com/foo/bar"), None);
        assert_eq!(parse_repo_slug("https://github.com/foo"), None);
        assert_eq!(parse_repo_slug("not a url"), None);
    }

    #[test]
    fn test_last_page_from_link() {
        let link = r#"<https://api.github.com/repositories/1/contributors?per_page=1&page=2>; rel="next", <https://api.github.com/repositories/1/contributors?per_page=1&page=57>; rel="last""#;
        assert_eq!(last_page_from_link(link), Some(57));
        assert_eq!(last_page_from_link(r#"<https://x.test/?page=2>; rel="next""#), None);
    }

    #[test]
    fn test_parse_repo_health() {
        let blob = json!({
            "repo": {
                "open_issues_count": 12,
                "stargazers_count": 900,
                "forks_count": 80,
                "archived": false
            },
            "commits": [
                {"commit": {"committer": {"date": "2024-06-01T12:00:00Z"}}}
            ],
            "issues": [
                {"created_at": "2024-01-01T00:00:00Z", "closed_at": "2024-01-03T00:00:00Z"},
                {"created_at": "2024-01-01T00:00:00Z", "closed_at": "2024-01-05T00:00:00Z"},
                {"created_at": "2024-01-01T00:00:00Z", "closed_at": "2024-03-01T00:00:00Z",
                 "pull_request": {"url": "x"}}
            ],
            "contributors": 31
        });
        let health = parse_repo_health(&blob).unwrap();
        assert_eq!(health.open_issues, Some(12));
        assert_eq!(health.closed_issues, Some(2));
        assert_eq!(health.avg_issue_close_days, Some(3.0));
        assert_eq!(health.stars, 900);
        assert_eq!(health.contributors, Some(31));
        assert_eq!(
            health.last_commit.map(|d| d.to_rfc3339()),
            Some("2024-06-01T12:00:00+00:00".to_string())
        );
    }

    #[test]
    fn test_partial_blob() {
        let blob = json!({"repo": {"open_issues_count": 3}, "commits": null, "issues": null});
        let health = parse_repo_health(&blob).unwrap();
        assert_eq!(health.closed_issues, None);
        assert_eq!(health.avg_issue_close_days, None);
        assert_eq!(health.last_commit, None);
        assert_eq!(health.resolution_rate(), None);
    }

    #[test]
    fn test_summary_is_required() {
        assert!(parse_repo_health(&json!({"repo": null, "issues": []})).is_none());
    }
}
