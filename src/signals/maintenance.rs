//! Maintenance activity from the age of the last commit

use super::{bucket_le, ScoringContext, SignalId};
use crate::models::{PackageMetadata, SignalResult};

/// Days since last commit -> risk, inclusive upper bounds
pub const COMMIT_AGE_BUCKETS: [(i64, f64); 3] = [(90, 0.0), (180, 0.3), (365, 0.6)];
pub const STALE_RISK: f64 = 1.0;
pub const NO_REPOSITORY_RISK: f64 = 0.6;
pub const NO_COMMIT_DATA_RISK: f64 = 0.5;

pub fn evaluate(meta: &PackageMetadata, ctx: &ScoringContext) -> SignalResult {
    let id = SignalId::Maintenance;

    if meta.discontinued {
        let result = SignalResult::scored(id, 1.0, "Package is discontinued");
        return match &meta.replaced_by {
            Some(replacement) => result.with_detail(format!("Replaced by {}", replacement)),
            None => result,
        };
    }

    if meta.repository_url.is_none() {
        return SignalResult::scored(id, NO_REPOSITORY_RISK, "No source repository published");
    }

    let Some(last_commit) = meta.repo_health.as_ref().and_then(|h| h.last_commit) else {
        return SignalResult::failed(id, NO_COMMIT_DATA_RISK, "Commit history unavailable");
    };

    let days = (ctx.now - last_commit).num_days().max(0);
    let risk = bucket_le(days, &COMMIT_AGE_BUCKETS, STALE_RISK);
    let result = SignalResult::scored(id, risk, format!("Last commit {} days ago", days));

    if meta.repo_health.as_ref().is_some_and(|h| h.archived) {
        result.with_detail("Repository is archived")
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RepoHealth;
    use crate::signals::test_support::*;
    use chrono::Duration;

    fn with_commit_days_ago(days: i64) -> PackageMetadata {
        meta().with_repo_health(RepoHealth {
            last_commit: Some(now() - Duration::days(days)),
            ..Default::default()
        })
    }

    #[test]
    fn test_commit_age_buckets() {
        let ctx = ctx();
        assert_eq!(evaluate(&with_commit_days_ago(0), &ctx).risk(), 0.0);
        assert_eq!(evaluate(&with_commit_days_ago(90), &ctx).risk(), 0.0);
        assert_eq!(evaluate(&with_commit_days_ago(91), &ctx).risk(), 0.3);
        assert_eq!(evaluate(&with_commit_days_ago(180), &ctx).risk(), 0.3);
        assert_eq!(evaluate(&with_commit_days_ago(365), &ctx).risk(), 0.6);
        assert_eq!(evaluate(&with_commit_days_ago(366), &ctx).risk(), 1.0);
    }

    #[test]
    fn test_discontinued_overrides_everything() {
        let meta = PackageMetadata {
            discontinued: true,
            replaced_by: Some("dio".to_string()),
            ..with_commit_days_ago(1)
        };
        let result = evaluate(&meta, &ctx());
        assert_eq!(result.risk(), 1.0);
        assert!(!result.failed);
        assert_eq!(result.detail.as_deref(), Some("Replaced by dio"));
    }

    #[test]
    fn test_missing_repository() {
        let meta = PackageMetadata {
            repository_url: None,
            ..meta()
        };
        let result = evaluate(&meta, &ctx());
        assert_eq!(result.risk(), NO_REPOSITORY_RISK);
        assert!(!result.failed);
    }

    #[test]
    fn test_missing_commit_data_is_failed() {
        let result = evaluate(&meta(), &ctx());
        assert!(result.failed);
        assert_eq!(result.risk(), NO_COMMIT_DATA_RISK);
    }
}
