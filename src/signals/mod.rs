//! Scoring signals
//!
//! Ten independent rules, each a pure function of a package snapshot and the
//! scan context. The set is closed: [`SignalId`] enumerates every rule and
//! dispatches to its evaluation function, so there is no registry to extend
//! and no unknown identifier to order.
//!
//! | Signal | Weight |
//! |---|---|
//! | Maintenance | 25 |
//! | Version freshness | 20 |
//! | Registry score | 10 |
//! | Safety opt-in | 8 |
//! | Release cadence | 8 |
//! | SDK compatibility | 7 |
//! | Open issues | 7 |
//! | Repository availability | 5 |
//! | Issue response | 5 |
//! | Verification | 5 |

pub mod availability;
pub mod cadence;
pub mod freshness;
pub mod issues;
pub mod maintenance;
pub mod registry_score;
pub mod safety;
pub mod sdk;
pub mod verification;

use crate::models::{PackageMetadata, SignalResult};
use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::error;

/// Risk recorded for a rule that faulted during evaluation
pub const FAULT_RISK: f64 = 0.5;

/// Inputs shared by every rule in one scan
#[derive(Debug, Clone)]
pub struct ScoringContext {
    /// Reference time for every age computation
    pub now: DateTime<Utc>,
    pub host_sdk: Option<Version>,
}

impl ScoringContext {
    pub fn new(now: DateTime<Utc>, host_sdk: Option<Version>) -> Self {
        Self { now, host_sdk }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalId {
    Maintenance,
    VersionFreshness,
    RegistryScore,
    SafetyOptIn,
    ReleaseCadence,
    SdkCompatibility,
    OpenIssues,
    RepositoryAvailability,
    IssueResponse,
    Verification,
}

impl SignalId {
    /// Every signal, heaviest first
    pub const ALL: [SignalId; 10] = [
        SignalId::Maintenance,
        SignalId::VersionFreshness,
        SignalId::RegistryScore,
        SignalId::SafetyOptIn,
        SignalId::ReleaseCadence,
        SignalId::SdkCompatibility,
        SignalId::OpenIssues,
        SignalId::RepositoryAvailability,
        SignalId::IssueResponse,
        SignalId::Verification,
    ];

    /// Relative influence in the aggregate; weights sum to 100
    pub fn weight(self) -> u32 {
        match self {
            SignalId::Maintenance => 25,
            SignalId::VersionFreshness => 20,
            SignalId::RegistryScore => 10,
            SignalId::SafetyOptIn => 8,
            SignalId::ReleaseCadence => 8,
            SignalId::SdkCompatibility => 7,
            SignalId::OpenIssues => 7,
            SignalId::RepositoryAvailability => 5,
            SignalId::IssueResponse => 5,
            SignalId::Verification => 5,
        }
    }

    /// Position in [`ALL`](Self::ALL); breaks weight ties when sorting
    pub fn rank(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(Self::ALL.len())
    }

    pub fn label(self) -> &'static str {
        match self {
            SignalId::Maintenance => "Maintenance",
            SignalId::VersionFreshness => "Version freshness",
            SignalId::RegistryScore => "Registry score",
            SignalId::SafetyOptIn => "Null safety",
            SignalId::ReleaseCadence => "Release cadence",
            SignalId::SdkCompatibility => "SDK compatibility",
            SignalId::OpenIssues => "Open issues",
            SignalId::RepositoryAvailability => "Repository",
            SignalId::IssueResponse => "Issue response",
            SignalId::Verification => "Verification",
        }
    }

    /// Run this rule without fault isolation
    pub fn evaluate(self, meta: &PackageMetadata, ctx: &ScoringContext) -> SignalResult {
        match self {
            SignalId::Maintenance => maintenance::evaluate(meta, ctx),
            SignalId::VersionFreshness => freshness::evaluate(meta, ctx),
            SignalId::RegistryScore => registry_score::evaluate(meta, ctx),
            SignalId::SafetyOptIn => safety::evaluate(meta, ctx),
            SignalId::ReleaseCadence => cadence::evaluate(meta, ctx),
            SignalId::SdkCompatibility => sdk::evaluate(meta, ctx),
            SignalId::OpenIssues => issues::evaluate_open_issues(meta, ctx),
            SignalId::RepositoryAvailability => availability::evaluate(meta, ctx),
            SignalId::IssueResponse => issues::evaluate_response(meta, ctx),
            SignalId::Verification => verification::evaluate(meta, ctx),
        }
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Evaluate one rule, converting a panic into a failed result.
pub fn evaluate_guarded(
    id: SignalId,
    meta: &PackageMetadata,
    ctx: &ScoringContext,
) -> SignalResult {
    evaluate_with(id, || id.evaluate(meta, ctx))
}

/// Fault boundary shared by [`evaluate_guarded`] and tests
pub(crate) fn evaluate_with<F>(id: SignalId, rule: F) -> SignalResult
where
    F: FnOnce() -> SignalResult,
{
    match catch_unwind(AssertUnwindSafe(rule)) {
        Ok(result) => result,
        Err(panic_info) => {
            let msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic".to_string()
            };
            error!("Signal {} panicked: {}", id, msg);
            SignalResult::failed(id, FAULT_RISK, format!("Evaluation failed: {}", msg))
        }
    }
}

/// Piecewise lookup: first bucket whose bound is `>= value`, else `overflow`
pub(crate) fn bucket_le<T: PartialOrd + Copy>(value: T, buckets: &[(T, f64)], overflow: f64) -> f64 {
    buckets
        .iter()
        .find(|(bound, _)| value <= *bound)
        .map(|(_, risk)| *risk)
        .unwrap_or(overflow)
}

/// Piecewise lookup with strict bounds: first bucket whose bound is `> value`
pub(crate) fn bucket_lt<T: PartialOrd + Copy>(value: T, buckets: &[(T, f64)], overflow: f64) -> f64 {
    buckets
        .iter()
        .find(|(bound, _)| value < *bound)
        .map(|(_, risk)| *risk)
        .unwrap_or(overflow)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::TimeZone;

    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    pub fn ctx() -> ScoringContext {
        ScoringContext::new(now(), Version::parse("3.4.0").ok())
    }

    pub fn meta() -> PackageMetadata {
        PackageMetadata {
            name: "sample".to_string(),
            current_version: "1.0.0".to_string(),
            latest_version: Some("1.0.0".to_string()),
            latest_stable_version: Some("1.0.0".to_string()),
            repository_url: Some("https://github.com/acme/sample".to_string()),
            ..Default::default()
        }
    }
}
