//! Output reporters for scan results
//!
//! Supports two output formats:
//! - `text` - Terminal table with colors
//! - `json` - Machine-readable JSON
//!
//! Reporters only present what the scoring engine produced; they never
//! recompute scores or tiers.

mod json;
mod text;

use crate::models::ProjectDiagnosis;
use anyhow::{anyhow, Result};
use std::str::FromStr;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" | "terminal" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow!("Unknown format '{}'. Valid formats: text, json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Render a diagnosis in the specified format
pub fn report(diagnosis: &ProjectDiagnosis, format: &str) -> Result<String> {
    let fmt = OutputFormat::from_str(format)?;
    report_with_format(diagnosis, fmt)
}

pub fn report_with_format(diagnosis: &ProjectDiagnosis, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => text::render(diagnosis),
        OutputFormat::Json => json::render(diagnosis),
    }
}
