//! Core data models for deprisk
//!
//! Package snapshots flow from the fetch layer into the scoring engine;
//! diagnosis results flow from the scoring engine to the reporters.
//! Snapshots are never mutated in place: enrichment returns a new value.

use crate::signals::SignalId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single published release of a package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    pub version: String,
    pub published: DateTime<Utc>,
}

/// Publisher verification, derived from publisher identity x curated-favorite tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VerificationTier {
    VerifiedFavorite,
    VerifiedPublisher,
    Favorite,
    #[default]
    Unverified,
}

impl VerificationTier {
    pub fn from_flags(has_publisher: bool, favorite: bool) -> Self {
        match (has_publisher, favorite) {
            (true, true) => VerificationTier::VerifiedFavorite,
            (true, false) => VerificationTier::VerifiedPublisher,
            (false, true) => VerificationTier::Favorite,
            (false, false) => VerificationTier::Unverified,
        }
    }
}

impl fmt::Display for VerificationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationTier::VerifiedFavorite => write!(f, "verified publisher, favorite"),
            VerificationTier::VerifiedPublisher => write!(f, "verified publisher"),
            VerificationTier::Favorite => write!(f, "favorite"),
            VerificationTier::Unverified => write!(f, "unverified"),
        }
    }
}

/// Repository-level health pulled from the code host
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RepoHealth {
    pub open_issues: Option<u64>,
    /// Closed issues within the most recent page (pull requests excluded)
    pub closed_issues: Option<u64>,
    pub stars: u64,
    pub forks: u64,
    pub contributors: Option<u64>,
    pub avg_issue_close_days: Option<f64>,
    pub last_commit: Option<DateTime<Utc>>,
    pub archived: bool,
}

impl RepoHealth {
    /// closed / (open + closed); `None` when either count is unknown or both are zero
    pub fn resolution_rate(&self) -> Option<f64> {
        let open = self.open_issues?;
        let closed = self.closed_issues?;
        let total = open + closed;
        if total == 0 {
            return None;
        }
        Some(closed as f64 / total as f64)
    }
}

/// Immutable snapshot of everything known about one dependency
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub name: String,
    pub current_version: String,
    pub latest_version: Option<String>,
    pub latest_stable_version: Option<String>,
    pub repository_url: Option<String>,
    pub issue_tracker_url: Option<String>,
    /// Registry quality score normalized to 0-100
    pub registry_score: Option<f64>,
    /// Registry popularity normalized to 0-100
    pub popularity: Option<f64>,
    pub like_count: Option<u64>,
    pub sdk_constraint: Option<String>,
    pub safety_opt_in: Option<bool>,
    pub discontinued: bool,
    pub replaced_by: Option<String>,
    /// Newest first
    pub releases: Vec<Release>,
    pub verification: VerificationTier,
    pub publisher: Option<String>,
    pub repo_health: Option<RepoHealth>,
    /// Outcome of the reachability probe; `None` when unknown or not attempted
    pub repository_reachable: Option<bool>,
    pub fetched_at: DateTime<Utc>,
    pub from_cache: bool,
}

impl PackageMetadata {
    pub fn with_repo_health(self, health: RepoHealth) -> Self {
        Self {
            repo_health: Some(health),
            repository_reachable: Some(true),
            ..self
        }
    }

    pub fn with_reachability(self, reachable: Option<bool>) -> Self {
        Self {
            repository_reachable: reachable,
            ..self
        }
    }
}

/// Outcome of one scoring rule for one package
///
/// `risk` is private so the `[0, 1]` range is enforced at construction;
/// an out-of-range value is a programming fault and panics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalResult {
    pub signal: SignalId,
    risk: f64,
    pub reason: String,
    pub detail: Option<String>,
    pub failed: bool,
}

fn checked_risk(risk: f64) -> f64 {
    assert!(
        risk.is_finite() && (0.0..=1.0).contains(&risk),
        "signal risk out of range: {risk}"
    );
    risk
}

impl SignalResult {
    /// A result computed from real data
    pub fn scored(signal: SignalId, risk: f64, reason: impl Into<String>) -> Self {
        Self {
            signal,
            risk: checked_risk(risk),
            reason: reason.into(),
            detail: None,
            failed: false,
        }
    }

    /// A result standing in for missing data; excluded from the aggregate
    pub fn failed(signal: SignalId, risk: f64, reason: impl Into<String>) -> Self {
        Self {
            signal,
            risk: checked_risk(risk),
            reason: reason.into(),
            detail: None,
            failed: true,
        }
    }

    pub fn with_detail(self, detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
            ..self
        }
    }

    pub fn risk(&self) -> f64 {
        self.risk
    }

    pub fn weight(&self) -> u32 {
        self.signal.weight()
    }
}

/// Five ordered risk bands derived from the aggregate score
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    #[default]
    Healthy,
    Low,
    Warning,
    Risky,
    Critical,
}

impl RiskTier {
    pub const HEALTHY_MAX: f64 = 20.0;
    pub const LOW_MAX: f64 = 40.0;
    pub const WARNING_MAX: f64 = 60.0;
    pub const RISKY_MAX: f64 = 80.0;

    pub fn from_score(score: f64) -> Self {
        match score {
            s if s <= Self::HEALTHY_MAX => RiskTier::Healthy,
            s if s <= Self::LOW_MAX => RiskTier::Low,
            s if s <= Self::WARNING_MAX => RiskTier::Warning,
            s if s <= Self::RISKY_MAX => RiskTier::Risky,
            _ => RiskTier::Critical,
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskTier::Healthy => write!(f, "healthy"),
            RiskTier::Low => write!(f, "low"),
            RiskTier::Warning => write!(f, "warning"),
            RiskTier::Risky => write!(f, "risky"),
            RiskTier::Critical => write!(f, "critical"),
        }
    }
}

impl FromStr for RiskTier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "healthy" => Ok(RiskTier::Healthy),
            "low" => Ok(RiskTier::Low),
            "warning" => Ok(RiskTier::Warning),
            "risky" => Ok(RiskTier::Risky),
            "critical" => Ok(RiskTier::Critical),
            _ => Err(anyhow::anyhow!(
                "Unknown tier '{}'. Valid tiers: healthy, low, warning, risky, critical",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Urgent,
    High,
    Normal,
    Info,
}

/// An actionable hint derived from the riskiest dimensions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub message: String,
}

impl Recommendation {
    pub fn new(priority: Priority, message: impl Into<String>) -> Self {
        Self {
            priority,
            message: message.into(),
        }
    }

    pub fn is_urgent(&self) -> bool {
        self.priority == Priority::Urgent
    }
}

/// Scored verdict for one package
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosisResult {
    pub package: String,
    pub current_version: String,
    pub latest_version: Option<String>,
    pub latest_stable_version: Option<String>,
    /// Aggregate risk, 0 (no risk) to 100
    pub score: f64,
    pub tier: RiskTier,
    /// Sorted by descending signal weight
    pub signals: Vec<SignalResult>,
    pub recommendations: Vec<Recommendation>,
    pub verification: VerificationTier,
    pub repo_health: Option<RepoHealth>,
    pub from_cache: bool,
}

impl DiagnosisResult {
    pub fn signal(&self, id: SignalId) -> Option<&SignalResult> {
        self.signals.iter().find(|s| s.signal == id)
    }
}

/// Number of packages per tier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TierCounts {
    pub healthy: usize,
    pub low: usize,
    pub warning: usize,
    pub risky: usize,
    pub critical: usize,
    pub total: usize,
}

impl TierCounts {
    pub fn from_results(results: &[DiagnosisResult]) -> Self {
        let mut counts = Self::default();
        for r in results {
            match r.tier {
                RiskTier::Healthy => counts.healthy += 1,
                RiskTier::Low => counts.low += 1,
                RiskTier::Warning => counts.warning += 1,
                RiskTier::Risky => counts.risky += 1,
                RiskTier::Critical => counts.critical += 1,
            }
            counts.total += 1;
        }
        counts
    }
}

/// Whole-project scan output consumed by the reporters
#[derive(Debug, Clone, Serialize)]
pub struct ProjectDiagnosis {
    /// Riskiest first
    pub results: Vec<DiagnosisResult>,
    pub counts: TierCounts,
    /// Dependencies the registry could not resolve; not scored
    pub unresolved: Vec<String>,
    pub host_sdk: Option<String>,
    pub scanned_at: DateTime<Utc>,
}

impl ProjectDiagnosis {
    pub fn worst_tier(&self) -> Option<RiskTier> {
        self.results.iter().map(|r| r.tier).max()
    }
}
