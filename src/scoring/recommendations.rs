//! Actionable hints from the riskiest dimensions of a diagnosis

use crate::models::{PackageMetadata, Priority, Recommendation, RiskTier, SignalResult};
use crate::signals::{freshness, issues, maintenance, verification, SignalId};

/// At most this many hints per package
pub const MAX_HINTS: usize = 3;

/// Build the ordered recommendation list for one package.
///
/// A discontinued package gets exactly one urgent recommendation and
/// nothing else.
pub fn recommend(meta: &PackageMetadata, signals: &[SignalResult], score: f64) -> Vec<Recommendation> {
    if meta.discontinued {
        let message = match &meta.replaced_by {
            Some(replacement) => format!(
                "{} is discontinued; migrate to {}",
                meta.name, replacement
            ),
            None => format!(
                "{} is discontinued; find a maintained alternative",
                meta.name
            ),
        };
        return vec![Recommendation::new(Priority::Urgent, message)];
    }

    let mut hints: Vec<(&SignalResult, Recommendation)> = signals
        .iter()
        .filter(|s| !s.failed)
        .filter_map(|s| hint_for(meta, s).map(|r| (s, r)))
        .collect();

    hints.sort_by(|(a, _), (b, _)| {
        b.risk()
            .total_cmp(&a.risk())
            .then_with(|| b.weight().cmp(&a.weight()))
    });

    let mut out: Vec<Recommendation> = hints
        .into_iter()
        .take(MAX_HINTS)
        .map(|(_, r)| r)
        .collect();

    if out.is_empty() {
        out.push(if score <= RiskTier::LOW_MAX {
            Recommendation::new(Priority::Info, "No action needed; dependency looks healthy")
        } else {
            Recommendation::new(
                Priority::Normal,
                "Review the signal breakdown before relying on this dependency",
            )
        });
    }
    out
}

fn hint_for(meta: &PackageMetadata, signal: &SignalResult) -> Option<Recommendation> {
    let risk = signal.risk();
    match signal.signal {
        SignalId::VersionFreshness if risk >= freshness::MAJOR_GAP_RISK => {
            let target = meta
                .latest_stable_version
                .as_deref()
                .or(meta.latest_version.as_deref())
                .unwrap_or("the latest release");
            Some(Recommendation::new(
                Priority::High,
                format!(
                    "Upgrade {} from {} to {} (major version behind)",
                    meta.name, meta.current_version, target
                ),
            ))
        }
        SignalId::SafetyOptIn if risk >= 1.0 => Some(Recommendation::new(
            Priority::High,
            format!(
                "{} is not null safe; upgrade to a null-safe release or replace it",
                meta.name
            ),
        )),
        SignalId::Maintenance if risk >= maintenance::NO_REPOSITORY_RISK => {
            let message = if meta.repository_url.is_none() {
                format!(
                    "{} publishes no source repository; maintenance cannot be verified",
                    meta.name
                )
            } else {
                format!(
                    "{} shows little maintenance activity; watch for an alternative",
                    meta.name
                )
            };
            Some(Recommendation::new(Priority::Normal, message))
        }
        SignalId::OpenIssues if risk >= issues::LARGE_BACKLOG_RISK => Some(Recommendation::new(
            Priority::Normal,
            format!(
                "{} has a large unresolved issue backlog; check open issues for problems affecting you",
                meta.name
            ),
        )),
        SignalId::Verification if risk >= verification::UNVERIFIED_RISK => {
            Some(Recommendation::new(
                Priority::Info,
                format!(
                    "{} has no verified publisher; review its ownership before upgrading",
                    meta.name
                ),
            ))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VerificationTier;
    use crate::signals::test_support::*;

    fn scored(id: SignalId, risk: f64) -> SignalResult {
        SignalResult::scored(id, risk, "test")
    }

    #[test]
    fn test_discontinued_is_single_urgent() {
        let meta = PackageMetadata {
            discontinued: true,
            replaced_by: Some("dio".to_string()),
            ..meta()
        };
        let signals = vec![
            scored(SignalId::VersionFreshness, 1.0),
            scored(SignalId::SafetyOptIn, 1.0),
        ];
        let recs = recommend(&meta, &signals, 90.0);
        assert_eq!(recs.len(), 1);
        assert!(recs[0].is_urgent());
        assert!(recs[0].message.contains("dio"));
    }

    #[test]
    fn test_hints_ordered_by_risk_then_weight() {
        let meta = PackageMetadata {
            verification: VerificationTier::Unverified,
            ..meta()
        };
        let signals = vec![
            scored(SignalId::Maintenance, 0.6),
            scored(SignalId::VersionFreshness, 1.0),
            scored(SignalId::SafetyOptIn, 1.0),
            scored(SignalId::Verification, 0.5),
        ];
        let recs = recommend(&meta, &signals, 70.0);
        assert_eq!(recs.len(), MAX_HINTS);
        assert!(recs[0].message.contains("major version behind"));
        assert!(recs[1].message.contains("not null safe"));
        assert!(recs[2].message.contains("maintenance"));
    }

    #[test]
    fn test_missing_repository_gets_its_own_hint() {
        let meta = PackageMetadata {
            repository_url: None,
            ..meta()
        };
        let recs = recommend(&meta, &[scored(SignalId::Maintenance, 0.6)], 50.0);
        assert_eq!(recs.len(), 1);
        assert!(recs[0].message.contains("publishes no source repository"));
        assert!(!recs[0].message.contains("maintenance activity"));
    }

    #[test]
    fn test_failed_signals_do_not_trigger_hints() {
        let signals = vec![SignalResult::failed(SignalId::Maintenance, 0.6, "n/a")];
        let recs = recommend(&meta(), &signals, 10.0);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].priority, Priority::Info);
    }

    #[test]
    fn test_generic_messages() {
        let healthy = recommend(&meta(), &[], 40.0);
        assert_eq!(healthy[0].priority, Priority::Info);
        let review = recommend(&meta(), &[], 40.5);
        assert_eq!(review[0].priority, Priority::Normal);
    }
}
