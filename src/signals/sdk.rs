//! Declared SDK constraint against the host SDK

use super::{ScoringContext, SignalId};
use crate::models::{PackageMetadata, SignalResult};
use crate::version::VersionConstraint;
use semver::Version;

/// Upper bounds this many minors above the host count as imminent breakage
pub const UPCOMING_INCOMPATIBILITY_MINORS: u64 = 2;
pub const UNDECLARED_RISK: f64 = 0.4;
pub const HOST_UNKNOWN_RISK: f64 = 0.2;
pub const UPCOMING_RISK: f64 = 0.4;
pub const EXCLUDED_RISK: f64 = 1.0;

/// Only bounds within the host's own major can be "close".
///
/// A next-major cap such as `<4.0.0` is the usual way of saying "any 3.x";
/// it announces no incompatibility, so it never counts as near even for a
/// host on the last minor of its major.
fn upper_is_near(host: &Version, upper: &Version) -> bool {
    upper.major == host.major
        && upper.minor >= host.minor
        && upper.minor - host.minor <= UPCOMING_INCOMPATIBILITY_MINORS
}

pub fn evaluate(meta: &PackageMetadata, ctx: &ScoringContext) -> SignalResult {
    let id = SignalId::SdkCompatibility;

    let Some(raw) = meta.sdk_constraint.as_deref() else {
        return SignalResult::scored(id, UNDECLARED_RISK, "No SDK constraint declared");
    };
    let Ok(constraint) = raw.parse::<VersionConstraint>() else {
        return SignalResult::failed(
            id,
            UNDECLARED_RISK,
            format!("Unreadable SDK constraint {:?}", raw),
        );
    };
    let Some(host) = ctx.host_sdk.as_ref() else {
        return SignalResult::failed(id, HOST_UNKNOWN_RISK, "Host SDK version unknown");
    };

    if !constraint.allows(host) {
        return SignalResult::scored(
            id,
            EXCLUDED_RISK,
            format!("SDK constraint {} excludes host SDK {}", constraint, host),
        );
    }

    match constraint.upper() {
        Some(upper) if upper_is_near(host, upper) => SignalResult::scored(
            id,
            UPCOMING_RISK,
            format!("SDK upper bound {} is close to host SDK {}", upper, host),
        ),
        _ => SignalResult::scored(id, 0.0, format!("Compatible with SDK {}", host)),
    }
}
