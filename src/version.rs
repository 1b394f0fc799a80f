//! Version and SDK constraint parsing
//!
//! Registry versions are semver, but pubspec SDK constraints use their own
//! small grammar:
//!
//! - `any` (or empty) - no bounds
//! - `^2.12.0` - caret: next major, or next minor for `0.x`
//! - `>=2.12.0 <3.0.0` - explicit range, operators may be space separated
//! - `2.12.0` - exact pin
//!
//! Parsing is lenient about short versions (`2.12` becomes `2.12.0`) because
//! hand-written pubspecs frequently omit the patch component.

use semver::Version;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Parse a version string leniently.
///
/// Accepts quotes, a leading `v` and missing minor/patch components.
pub fn parse_version(raw: &str) -> Option<Version> {
    let raw = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim_start_matches('v');
    if raw.is_empty() {
        return None;
    }
    if let Ok(v) = Version::parse(raw) {
        return Some(v);
    }

    let split = raw.find(['-', '+']).unwrap_or(raw.len());
    let (core, rest) = raw.split_at(split);
    let parts: Vec<&str> = core.split('.').collect();
    if parts.len() > 3
        || parts
            .iter()
            .any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }

    let mut padded = parts.join(".");
    for _ in parts.len()..3 {
        padded.push_str(".0");
    }
    padded.push_str(rest);
    Version::parse(&padded).ok()
}

/// True for `1.0.0-dev.1` style versions
pub fn is_prerelease(version: &Version) -> bool {
    !version.pre.is_empty()
}

/// One side of a constraint range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    pub version: Version,
    pub inclusive: bool,
}

impl Bound {
    fn inclusive(version: Version) -> Self {
        Self {
            version,
            inclusive: true,
        }
    }

    fn exclusive(version: Version) -> Self {
        Self {
            version,
            inclusive: false,
        }
    }
}

/// A parsed SDK (or dependency) version constraint
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionConstraint {
    lower: Option<Bound>,
    upper: Option<Bound>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid version constraint: {0:?}")]
pub struct ConstraintParseError(pub String);

impl VersionConstraint {
    /// Constraint that allows every version
    pub fn any() -> Self {
        Self::default()
    }

    pub fn lower(&self) -> Option<&Version> {
        self.lower.as_ref().map(|b| &b.version)
    }

    pub fn upper(&self) -> Option<&Version> {
        self.upper.as_ref().map(|b| &b.version)
    }

    pub fn is_any(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }

    /// Check whether `version` satisfies this constraint.
    ///
    /// An exclusive upper bound without a pre-release tag also excludes
    /// pre-releases of that exact version (`<3.0.0` rejects `3.0.0-dev`).
    pub fn allows(&self, version: &Version) -> bool {
        if let Some(lower) = &self.lower {
            match version.cmp(&lower.version) {
                Ordering::Less => return false,
                Ordering::Equal if !lower.inclusive => return false,
                _ => {}
            }
        }
        if let Some(upper) = &self.upper {
            match version.cmp(&upper.version) {
                Ordering::Greater => return false,
                Ordering::Equal if !upper.inclusive => return false,
                _ => {}
            }
            if !upper.inclusive
                && upper.version.pre.is_empty()
                && !version.pre.is_empty()
                && same_release(version, &upper.version)
            {
                return false;
            }
        }
        true
    }

    fn apply(&mut self, op: &str, version: Version) {
        match op {
            ">=" => self.lower = Some(Bound::inclusive(version)),
            ">" => self.lower = Some(Bound::exclusive(version)),
            "<=" => self.upper = Some(Bound::inclusive(version)),
            "<" => self.upper = Some(Bound::exclusive(version)),
            "^" => {
                let next = if version.major > 0 {
                    Version::new(version.major + 1, 0, 0)
                } else {
                    Version::new(0, version.minor + 1, 0)
                };
                self.lower = Some(Bound::inclusive(version));
                self.upper = Some(Bound::exclusive(next));
            }
            _ => {
                self.lower = Some(Bound::inclusive(version.clone()));
                self.upper = Some(Bound::inclusive(version));
            }
        }
    }
}

fn same_release(a: &Version, b: &Version) -> bool {
    a.major == b.major && a.minor == b.minor && a.patch == b.patch
}

const OPERATORS: [&str; 5] = [">=", "<=", ">", "<", "^"];

fn split_operator(token: &str) -> (&str, &str) {
    for op in OPERATORS {
        if let Some(rest) = token.strip_prefix(op) {
            return (op, rest);
        }
    }
    ("", token)
}

impl FromStr for VersionConstraint {
    type Err = ConstraintParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().trim_matches(|c| c == '"' || c == '\'').trim();
        if raw.is_empty() || raw == "any" {
            return Ok(Self::any());
        }

        let mut constraint = Self::default();
        let mut tokens = raw.split_whitespace();
        while let Some(token) = tokens.next() {
            let (op, mut rest) = split_operator(token);
            // ">= 2.12.0" with a space between operator and version
            if rest.is_empty() && !op.is_empty() {
                rest = tokens
                    .next()
                    .ok_or_else(|| ConstraintParseError(s.to_string()))?;
            }
            let version = parse_version(rest).ok_or_else(|| ConstraintParseError(s.to_string()))?;
            constraint.apply(op, version);
        }
        Ok(constraint)
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_any() {
            return write!(f, "any");
        }
        let mut parts = Vec::new();
        if let Some(lower) = &self.lower {
            let op = if lower.inclusive { ">=" } else { ">" };
            parts.push(format!("{op}{}", lower.version));
        }
        if let Some(upper) = &self.upper {
            let op = if upper.inclusive { "<=" } else { "<" };
            parts.push(format!("{op}{}", upper.version));
        }
        write!(f, "{}", parts.join(" "))
    }
}
