//! Rate-limited, cached fetch layer
//!
//! Two upstream API families are admitted through independent gates so that
//! saturating one never starves the other:
//!
//! - the package registry (caller-configurable capacity, shared with the
//!   reachability probe)
//! - the code host (fixed internal capacity)
//!
//! Every request runs under a [`RetryPolicy`] and every successful payload is
//! written to the [`KeyedCache`](crate::cache::KeyedCache). Fetchers never
//! return errors to their callers: exhausted retries, 404s and malformed
//! bodies all surface as `None`.

pub mod gate;
pub mod reachability;
pub mod registry;
pub mod repo_health;
pub mod retry;

pub use gate::{ConcurrencyGate, GatePermit};
pub use reachability::ReachabilityProbe;
pub use registry::RegistryFetcher;
pub use repo_health::RepoHealthFetcher;
pub use retry::RetryPolicy;

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single upstream request, classified by retry behaviour
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Malformed bodies will not improve on retry
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FetchError::Malformed(_))
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetchError::RateLimited(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            FetchError::Malformed(e.to_string())
        } else {
            FetchError::Transient(e.to_string())
        }
    }
}

/// Outcome of one upstream lookup once retries are settled
///
/// Only `Found` and `Absent` are answers from upstream. `GaveUp` covers
/// exhausted retries, rate-limit rejections and malformed bodies; anything
/// derived from it must not be cached.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    /// Upstream says the resource does not exist
    Absent,
    GaveUp,
}

impl<T> Lookup<T> {
    /// Collapse a retried `Option<Option<T>>` (outer `None` = gave up)
    pub fn from_retry(outcome: Option<Option<T>>) -> Self {
        match outcome {
            Some(Some(value)) => Lookup::Found(value),
            Some(None) => Lookup::Absent,
            None => Lookup::GaveUp,
        }
    }

    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            _ => None,
        }
    }

    /// True when the outcome is safe to cache
    pub fn is_definitive(&self) -> bool {
        !matches!(self, Lookup::GaveUp)
    }
}

/// Status, headers and (for 2xx only) the decoded JSON body
#[derive(Debug)]
pub(crate) struct JsonResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
}

/// Send a request and decode a successful body as JSON.
///
/// An empty 2xx body (e.g. 204) decodes to `Value::Null`.
pub(crate) async fn send_json(
    request: reqwest::RequestBuilder,
) -> Result<JsonResponse, FetchError> {
    let response = request.send().await?;
    let status = response.status();
    let headers = response.headers().clone();

    let body = if status.is_success() {
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            Some(serde_json::Value::Null)
        } else {
            Some(
                serde_json::from_slice(&bytes)
                    .map_err(|e| FetchError::Malformed(e.to_string()))?,
            )
        }
    } else {
        None
    };

    Ok(JsonResponse {
        status,
        headers,
        body,
    })
}

/// Shared HTTP client for all fetchers
pub fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("deprisk/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
}
