//! Dependency Risk Scoring
//!
//! Combines the ten signal results for one package into a single 0-100 risk
//! score, a tier, and a short list of recommendations.
//!
//! # Scoring Formula
//!
//! ```text
//! Score = Σ(weight × risk) / Σ(weight) × 100     over non-failed signals
//!       = 0                                       if every signal failed
//! ```
//!
//! A failed signal (data unavailable, or a rule that faulted) contributes to
//! neither sum, so missing data never drags a package toward healthy or
//! toward critical. Its result is still reported.
//!
//! # Tiers
//!
//! - Healthy: ≤ 20
//! - Low: ≤ 40
//! - Warning: ≤ 60
//! - Risky: ≤ 80
//! - Critical: > 80
//!
//! # Example
//!
//! Maintenance 0.6 (w25), freshness 0.5 (w20), everything else 0.0 and
//! issue data unavailable (open issues and issue response failed, w12):
//!
//! Score = (25 × 0.6 + 20 × 0.5) / (100 - 12) × 100 = 28.4 → Low

mod engine;
mod recommendations;

pub use engine::{aggregate, sort_by_weight, ScoringEngine};
pub use recommendations::{recommend, MAX_HINTS};
