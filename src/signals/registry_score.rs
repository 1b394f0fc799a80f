use super::{ScoringContext, SignalId};
use crate::models::{PackageMetadata, SignalResult};

pub const MISSING_RISK: f64 = 0.4;

/// Inverse of the registry's own 0-100 quality score
pub fn evaluate(meta: &PackageMetadata, _ctx: &ScoringContext) -> SignalResult {
    let id = SignalId::RegistryScore;
    match meta.registry_score {
        Some(score) if score.is_finite() => {
            let risk = (1.0 - score / 100.0).clamp(0.0, 1.0);
            SignalResult::scored(id, risk, format!("Registry score {:.0}/100", score))
        }
        _ => SignalResult::failed(id, MISSING_RISK, "Registry score unavailable"),
    }
}
