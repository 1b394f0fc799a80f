//! Bounded exponential backoff with jitter
//!
//! Rate-limit rejections back off on a steeper curve than generic failures.
//! Malformed payloads are never retried. An exhausted operation yields `None`
//! rather than an error: the caller treats it like a missing resource.

use super::FetchError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Growth per attempt for generic failures
    pub backoff_factor: f64,
    /// Growth per attempt after a rate-limit rejection
    pub rate_limit_factor: f64,
    /// Fractional jitter applied symmetrically (0.2 = ±20%)
    pub jitter: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            backoff_factor: 2.0,
            rate_limit_factor: 4.0,
            jitter: 0.2,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that tries exactly once
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Un-jittered delay before retry number `attempt + 1` (0-based)
    pub fn delay_for(&self, attempt: u32, rate_limited: bool) -> Duration {
        let factor = if rate_limited {
            self.rate_limit_factor
        } else {
            self.backoff_factor
        };
        let secs = self.base_delay.as_secs_f64() * factor.powi(attempt as i32);
        clamp_delay(secs, self.max_delay)
    }

    /// Upper and lower bounds of the jittered delay
    pub fn delay_envelope(&self, attempt: u32, rate_limited: bool) -> (Duration, Duration) {
        let nominal = self.delay_for(attempt, rate_limited).as_secs_f64();
        (
            clamp_delay(nominal * (1.0 - self.jitter), self.max_delay),
            clamp_delay(nominal * (1.0 + self.jitter), self.max_delay),
        )
    }

    fn jittered(&self, attempt: u32, rate_limited: bool) -> Duration {
        let nominal = self.delay_for(attempt, rate_limited).as_secs_f64();
        let scale = if self.jitter > 0.0 {
            1.0 + rand::rng().random_range(-self.jitter..=self.jitter)
        } else {
            1.0
        };
        clamp_delay(nominal * scale, self.max_delay)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let attempts = self.max_attempts.max(1);
        for attempt in 0..attempts {
            let err = match op().await {
                Ok(value) => return Some(value),
                Err(e) => e,
            };

            if !err.is_retryable() {
                debug!("{}: {} (not retrying)", label, err);
                return None;
            }
            if attempt + 1 == attempts {
                warn!("{}: giving up after {} attempts: {}", label, attempts, err);
                return None;
            }

            let delay = self.jittered(attempt, err.is_rate_limited());
            debug!(
                "{}: attempt {} failed ({}), retrying in {}ms",
                label,
                attempt + 1,
                err,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }
        None
    }
}

fn clamp_delay(secs: f64, max: Duration) -> Duration {
    if !secs.is_finite() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(secs).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy() -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::from_millis(100),
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn test_rate_limit_curve_is_steeper() {
        let p = policy();
        assert_eq!(p.delay_for(0, false), Duration::from_millis(100));
        assert_eq!(p.delay_for(1, false), Duration::from_millis(200));
        assert_eq!(p.delay_for(1, true), Duration::from_millis(400));
        assert!(p.delay_for(2, true) > p.delay_for(2, false));
    }

    #[test]
    fn test_delay_is_capped() {
        let p = policy();
        assert_eq!(p.delay_for(30, true), p.max_delay);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_transient_failures() {
        let p = policy();
        let calls = AtomicU32::new(0);
        let start = tokio::time::Instant::now();

        let result = p
            .run("test", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(FetchError::Transient("503".into()))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result, Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        // Two sleeps: ~100ms and ~200ms, each within ±20%
        let (lo0, hi0) = p.delay_envelope(0, false);
        let (lo1, hi1) = p.delay_envelope(1, false);
        let elapsed = start.elapsed();
        assert!(elapsed >= lo0 + lo1, "elapsed {:?}", elapsed);
        assert!(elapsed <= hi0 + hi1 + Duration::from_millis(1), "elapsed {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_yields_none() {
        let p = policy();
        let calls = AtomicU32::new(0);
        let result: Option<()> = p
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(FetchError::RateLimited("429".into())) }
            })
            .await;
        assert_eq!(result, None);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_waits_longer() {
        let p = policy();
        let start = tokio::time::Instant::now();
        let _: Option<()> = p
            .run("test", || async { Err(FetchError::RateLimited("429".into())) })
            .await;
        let (lo0, _) = p.delay_envelope(0, true);
        let (lo1, _) = p.delay_envelope(1, true);
        assert!(start.elapsed() >= lo0 + lo1);
        // 100ms + 400ms nominal; generic failures would top out at 360ms
        assert!(start.elapsed() > Duration::from_millis(360));
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_is_not_retried() {
        let p = policy();
        let calls = AtomicU32::new(0);
        let result: Option<()> = p
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(FetchError::Malformed("bad json".into())) }
            })
            .await;
        assert_eq!(result, None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_single_attempt_policy() {
        let calls = AtomicU32::new(0);
        let _: Option<()> = RetryPolicy::none()
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(FetchError::Transient("x".into())) }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
