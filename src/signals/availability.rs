use super::{ScoringContext, SignalId};
use crate::models::{PackageMetadata, SignalResult};

pub const NO_URL_RISK: f64 = 0.8;
pub const UNREACHABLE_RISK: f64 = 1.0;
pub const UNKNOWN_RISK: f64 = 0.1;

/// Whether the published source repository still exists
pub fn evaluate(meta: &PackageMetadata, _ctx: &ScoringContext) -> SignalResult {
    let id = SignalId::RepositoryAvailability;
    if meta.repository_url.is_none() {
        return SignalResult::scored(id, NO_URL_RISK, "No repository URL");
    }

    let reachable = if meta.repo_health.is_some() {
        Some(true)
    } else {
        meta.repository_reachable
    };
    match reachable {
        Some(true) => SignalResult::scored(id, 0.0, "Repository reachable"),
        Some(false) => SignalResult::scored(id, UNREACHABLE_RISK, "Repository unreachable"),
        None => SignalResult::scored(id, UNKNOWN_RISK, "Repository not checked"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RepoHealth;
    use crate::signals::test_support::*;

    #[test]
    fn test_probe_outcomes() {
        let ctx = ctx();
        assert_eq!(evaluate(&meta(), &ctx).risk(), UNKNOWN_RISK);
        assert_eq!(
            evaluate(&meta().with_reachability(Some(true)), &ctx).risk(),
            0.0
        );
        assert_eq!(
            evaluate(&meta().with_reachability(Some(false)), &ctx).risk(),
            UNREACHABLE_RISK
        );
    }

    #[test]
    fn test_health_implies_reachable() {
        let meta = meta().with_repo_health(RepoHealth::default());
        assert_eq!(evaluate(&meta, &ctx()).risk(), 0.0);
    }

    #[test]
    fn test_no_url() {
        let meta = PackageMetadata {
            repository_url: None,
            ..meta()
        };
        assert_eq!(evaluate(&meta, &ctx()).risk(), NO_URL_RISK);
    }
}
