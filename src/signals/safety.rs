//! Null-safety opt-in

use super::{ScoringContext, SignalId};
use crate::models::{PackageMetadata, SignalResult};
use crate::version::VersionConstraint;
use semver::Version;

/// First SDK release with sound null safety
pub const SAFETY_THRESHOLD: Version = Version::new(2, 12, 0);
pub const UNKNOWN_RISK: f64 = 0.3;

/// Opted in iff the constraint's lower bound is at least the threshold.
///
/// `None` when the constraint does not parse.
pub fn infer_safety_opt_in(sdk_constraint: &str) -> Option<bool> {
    let constraint: VersionConstraint = sdk_constraint.parse().ok()?;
    Some(constraint.lower().is_some_and(|lower| *lower >= SAFETY_THRESHOLD))
}

pub fn evaluate(meta: &PackageMetadata, _ctx: &ScoringContext) -> SignalResult {
    let id = SignalId::SafetyOptIn;
    let opted_in = meta
        .safety_opt_in
        .or_else(|| meta.sdk_constraint.as_deref().and_then(infer_safety_opt_in));

    match opted_in {
        Some(true) => SignalResult::scored(id, 0.0, "Null safe"),
        Some(false) => SignalResult::scored(id, 1.0, "Not opted into null safety"),
        None => SignalResult::failed(id, UNKNOWN_RISK, "Null-safety status unknown"),
    }
}
