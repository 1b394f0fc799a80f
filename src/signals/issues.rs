//! Issue backlog and issue response latency

use super::{bucket_le, ScoringContext, SignalId};
use crate::models::{PackageMetadata, SignalResult};

/// Open-issue count -> risk, inclusive upper bounds
pub const OPEN_ISSUE_BUCKETS: [(u64, f64); 5] =
    [(0, 0.0), (10, 0.1), (30, 0.3), (100, 0.5), (300, 0.7)];
pub const OPEN_ISSUE_OVERFLOW_RISK: f64 = 0.9;
/// Share of the backlog-count component in the blend
pub const COUNT_WEIGHT: f64 = 0.5;
/// Share of the resolution-rate component in the blend
pub const RATE_WEIGHT: f64 = 0.5;
/// Rate component when the resolution rate is undefined
pub const UNKNOWN_RATE_RISK: f64 = 0.3;
/// Blended risk at which the backlog warrants a recommendation
pub const LARGE_BACKLOG_RISK: f64 = 0.5;

/// Mean close days -> risk, inclusive upper bounds
pub const CLOSE_DAYS_BUCKETS: [(f64, f64); 4] = [(7.0, 0.0), (30.0, 0.2), (90.0, 0.5), (180.0, 0.75)];
pub const SLOW_RESPONSE_RISK: f64 = 1.0;

pub const NO_DATA_RISK: f64 = 0.3;

pub fn evaluate_open_issues(meta: &PackageMetadata, _ctx: &ScoringContext) -> SignalResult {
    let id = SignalId::OpenIssues;
    let Some((health, open)) = meta
        .repo_health
        .as_ref()
        .and_then(|h| h.open_issues.map(|open| (h, open)))
    else {
        return SignalResult::failed(id, NO_DATA_RISK, "Issue data unavailable");
    };

    let count_risk = bucket_le(open, &OPEN_ISSUE_BUCKETS, OPEN_ISSUE_OVERFLOW_RISK);
    let rate = health.resolution_rate();
    let rate_risk = rate.map(|r| 1.0 - r).unwrap_or(UNKNOWN_RATE_RISK);
    let risk = (COUNT_WEIGHT * count_risk + RATE_WEIGHT * rate_risk).clamp(0.0, 1.0);

    let result = SignalResult::scored(id, risk, format!("{} open issues", open));
    match rate {
        Some(r) => result.with_detail(format!("{:.0}% of recent issues resolved", r * 100.0)),
        None => result,
    }
}

pub fn evaluate_response(meta: &PackageMetadata, _ctx: &ScoringContext) -> SignalResult {
    let id = SignalId::IssueResponse;
    let Some(days) = meta
        .repo_health
        .as_ref()
        .and_then(|h| h.avg_issue_close_days)
        .filter(|d| d.is_finite())
    else {
        return SignalResult::failed(id, NO_DATA_RISK, "Issue close times unavailable");
    };

    let risk = bucket_le(days, &CLOSE_DAYS_BUCKETS, SLOW_RESPONSE_RISK);
    SignalResult::scored(
        id,
        risk,
        format!("Issues closed in {:.1} days on average", days),
    )
}
