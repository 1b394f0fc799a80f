//! JSON reporter
//!
//! Outputs the full ProjectDiagnosis as pretty-printed JSON.
//! Useful for CI gates, piping to jq, or further processing.

use crate::models::ProjectDiagnosis;
use anyhow::Result;

/// Render diagnosis as JSON
pub fn render(diagnosis: &ProjectDiagnosis) -> Result<String> {
    Ok(serde_json::to_string_pretty(diagnosis)?)
}
