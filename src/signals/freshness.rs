//! How far the resolved version trails the newest release

use super::{ScoringContext, SignalId};
use crate::models::{PackageMetadata, SignalResult};
use crate::version::{is_prerelease, parse_version};
use semver::{BuildMetadata, Version};

pub const UNKNOWN_RISK: f64 = 0.3;
pub const PRERELEASE_RISK: f64 = 0.4;
pub const MAJOR_GAP_RISK: f64 = 1.0;
pub const MINOR_GAP_RISK: f64 = 0.5;
pub const PATCH_GAP_RISK: f64 = 0.2;

/// Build metadata does not affect precedence
fn precedence(mut v: Version) -> Version {
    v.build = BuildMetadata::EMPTY;
    v
}

pub fn evaluate(meta: &PackageMetadata, _ctx: &ScoringContext) -> SignalResult {
    let id = SignalId::VersionFreshness;

    let target = meta
        .latest_stable_version
        .as_deref()
        .or(meta.latest_version.as_deref());
    let Some((target_raw, target)) = target.and_then(|t| parse_version(t).map(|v| (t, v))) else {
        return SignalResult::failed(id, UNKNOWN_RISK, "Latest version unknown");
    };
    let Some(current) = parse_version(&meta.current_version) else {
        return SignalResult::failed(
            id,
            UNKNOWN_RISK,
            format!("Cannot compare version {}", meta.current_version),
        );
    };
    let (current, target) = (precedence(current), precedence(target));

    if current >= target {
        return SignalResult::scored(id, 0.0, format!("Up to date ({})", meta.current_version));
    }

    let (risk, reason) = if is_prerelease(&current) && !is_prerelease(&target) {
        (PRERELEASE_RISK, "Pre-release in use, stable release available")
    } else if current.major < target.major {
        (MAJOR_GAP_RISK, "Major version behind")
    } else if current.minor < target.minor {
        (MINOR_GAP_RISK, "Minor version behind")
    } else {
        (PATCH_GAP_RISK, "Patch version behind")
    };

    SignalResult::scored(id, risk, reason)
        .with_detail(format!("{} -> {}", meta.current_version, target_raw))
}
