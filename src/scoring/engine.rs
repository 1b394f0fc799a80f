use super::recommendations::recommend;
use crate::models::{DiagnosisResult, PackageMetadata, RiskTier, SignalResult};
use crate::signals::{evaluate_guarded, ScoringContext, SignalId};
use tracing::debug;

/// Stateless; one instance can diagnose any number of packages concurrently
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEngine;

impl ScoringEngine {
    pub fn new() -> Self {
        Self
    }

    /// Every signal for one package, heaviest first
    pub fn evaluate_all(&self, meta: &PackageMetadata, ctx: &ScoringContext) -> Vec<SignalResult> {
        let mut results: Vec<SignalResult> = SignalId::ALL
            .iter()
            .map(|id| evaluate_guarded(*id, meta, ctx))
            .collect();
        sort_by_weight(&mut results);
        results
    }

    pub fn diagnose(&self, meta: &PackageMetadata, ctx: &ScoringContext) -> DiagnosisResult {
        let signals = self.evaluate_all(meta, ctx);
        let score = aggregate(&signals);
        let tier = RiskTier::from_score(score);
        let recommendations = recommend(meta, &signals, score);

        debug!(
            "{} {}: score {:.1} ({}), {} of {} signals failed",
            meta.name,
            meta.current_version,
            score,
            tier,
            signals.iter().filter(|s| s.failed).count(),
            signals.len()
        );

        DiagnosisResult {
            package: meta.name.clone(),
            current_version: meta.current_version.clone(),
            latest_version: meta.latest_version.clone(),
            latest_stable_version: meta.latest_stable_version.clone(),
            score,
            tier,
            signals,
            recommendations,
            verification: meta.verification,
            repo_health: meta.repo_health.clone(),
            from_cache: meta.from_cache,
        }
    }
}

/// Weighted mean risk of the non-failed results, scaled to 0-100.
///
/// Zero when every result failed.
pub fn aggregate(results: &[SignalResult]) -> f64 {
    let (weighted, total) = results
        .iter()
        .filter(|r| !r.failed)
        .fold((0.0, 0.0), |(weighted, total), r| {
            let w = f64::from(r.weight());
            (weighted + w * r.risk(), total + w)
        });
    if total <= 0.0 {
        return 0.0;
    }
    (weighted / total * 100.0).clamp(0.0, 100.0)
}

/// Descending weight; equal weights keep [`SignalId::ALL`] order
pub fn sort_by_weight(results: &mut [SignalResult]) {
    results.sort_by(|a, b| {
        b.weight()
            .cmp(&a.weight())
            .then_with(|| a.signal.rank().cmp(&b.signal.rank()))
    });
}
