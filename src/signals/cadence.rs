use super::{bucket_lt, ScoringContext, SignalId};
use crate::models::{PackageMetadata, SignalResult};

/// Mean days between releases -> risk, exclusive upper bounds
pub const GAP_BUCKETS: [(f64, f64); 3] = [(90.0, 0.0), (180.0, 0.3), (365.0, 0.6)];
pub const SLOW_RISK: f64 = 1.0;
pub const TOO_FEW_RELEASES_RISK: f64 = 0.5;

/// Release cadence from the mean gap between consecutive releases
pub fn evaluate(meta: &PackageMetadata, _ctx: &ScoringContext) -> SignalResult {
    let id = SignalId::ReleaseCadence;
    let releases = &meta.releases;
    if releases.len() < 2 {
        return SignalResult::scored(id, TOO_FEW_RELEASES_RISK, "Fewer than two releases");
    }

    // Newest first, so the span is first minus last
    let (newest, oldest) = (&releases[0], &releases[releases.len() - 1]);
    let span_days = (newest.published - oldest.published).num_hours().max(0) as f64 / 24.0;
    let mean_gap = span_days / (releases.len() - 1) as f64;

    let risk = bucket_lt(mean_gap, &GAP_BUCKETS, SLOW_RISK);
    SignalResult::scored(
        id,
        risk,
        format!("A release every {:.0} days on average", mean_gap),
    )
}
