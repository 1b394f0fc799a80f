//! Fallback existence check for repositories without health data

use super::ConcurrencyGate;
use crate::cache::{KeyedCache, PROBE_TTL};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct ReachabilityProbe {
    client: reqwest::Client,
    cache: KeyedCache,
    gate: Arc<ConcurrencyGate>,
    timeout: Duration,
}

impl ReachabilityProbe {
    /// `gate` is the registry gate; probes share its admission control.
    pub fn new(
        client: reqwest::Client,
        cache: KeyedCache,
        gate: Arc<ConcurrencyGate>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            cache,
            gate,
            timeout,
        }
    }

    /// `Some(true)` for status < 400, `Some(false)` for any other status,
    /// `None` when the connection itself failed.
    pub async fn probe(&self, url: &str) -> Option<bool> {
        let key = format!("probe:{}", url);
        if let Some(reachable) = self.cache.get_as::<bool>(&key) {
            return Some(reachable);
        }

        let status = {
            let _permit = self.gate.acquire().await;
            self.client
                .head(url)
                .timeout(self.timeout)
                .send()
                .await
                .map(|r| r.status())
        };

        match status {
            Ok(status) => {
                let reachable = status.as_u16() < 400;
                debug!("Probe {} -> {}", url, status);
                if let Err(e) = self.cache.set_as(&key, &reachable, PROBE_TTL) {
                    debug!("Failed to cache probe result for {}: {}", url, e);
                }
                Some(reachable)
            }
            Err(e) => {
                debug!("Probe {} failed: {}", url, e);
                None
            }
        }
    }
}
