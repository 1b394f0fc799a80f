use super::{ScoringContext, SignalId};
use crate::models::{PackageMetadata, SignalResult, VerificationTier};

pub const PARTIAL_RISK: f64 = 0.05;
pub const UNVERIFIED_RISK: f64 = 0.5;

/// Publisher identity crossed with the curated favorite tag
pub fn evaluate(meta: &PackageMetadata, _ctx: &ScoringContext) -> SignalResult {
    let id = SignalId::Verification;
    let risk = match meta.verification {
        VerificationTier::VerifiedFavorite => 0.0,
        VerificationTier::VerifiedPublisher | VerificationTier::Favorite => PARTIAL_RISK,
        VerificationTier::Unverified => UNVERIFIED_RISK,
    };
    let result = SignalResult::scored(id, risk, meta.verification.to_string());
    match &meta.publisher {
        Some(publisher) => result.with_detail(format!("Published by {}", publisher)),
        None => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::test_support::*;

    #[test]
    fn test_tiers() {
        let ctx = ctx();
        let risk = |verification| {
            evaluate(
                &PackageMetadata {
                    verification,
                    ..meta()
                },
                &ctx,
            )
            .risk()
        };
        assert_eq!(risk(VerificationTier::VerifiedFavorite), 0.0);
        assert_eq!(risk(VerificationTier::VerifiedPublisher), PARTIAL_RISK);
        assert_eq!(risk(VerificationTier::Favorite), PARTIAL_RISK);
        assert_eq!(risk(VerificationTier::Unverified), UNVERIFIED_RISK);
    }
}
