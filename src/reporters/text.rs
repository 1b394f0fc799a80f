//! Text (terminal) reporter with colors and formatting

use crate::models::{DiagnosisResult, Priority, ProjectDiagnosis, RiskTier};
use anyhow::Result;

/// Tier colors (ANSI escape codes)
fn tier_color(tier: RiskTier) -> &'static str {
    match tier {
        RiskTier::Healthy => "\x1b[32m", // Green
        RiskTier::Low => "\x1b[92m",     // Light green
        RiskTier::Warning => "\x1b[33m", // Yellow
        RiskTier::Risky => "\x1b[91m",   // Light red
        RiskTier::Critical => "\x1b[31m", // Red
    }
}

fn priority_tag(priority: Priority) -> &'static str {
    match priority {
        Priority::Urgent => "\x1b[31m[!]",
        Priority::High => "\x1b[91m[H]",
        Priority::Normal => "\x1b[33m[M]",
        Priority::Info => "\x1b[90m[i]",
    }
}

/// Reset ANSI color
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

/// Packages listed with their recommendations
const DETAIL_LIMIT: usize = 5;

/// Render diagnosis as formatted terminal output
pub fn render(diagnosis: &ProjectDiagnosis) -> Result<String> {
    let mut out = String::new();

    // Header
    out.push_str(&format!("\n{BOLD}Dependency Risk Report{RESET}\n"));
    out.push_str(&format!(
        "{DIM}──────────────────────────────────────{RESET}\n"
    ));
    out.push_str(&format!(
        "Packages: {}  Host SDK: {}\n\n",
        diagnosis.counts.total,
        diagnosis.host_sdk.as_deref().unwrap_or("unknown")
    ));

    // Tier summary
    let c = &diagnosis.counts;
    let mut summary_parts = Vec::new();
    for (tier, n) in [
        (RiskTier::Critical, c.critical),
        (RiskTier::Risky, c.risky),
        (RiskTier::Warning, c.warning),
        (RiskTier::Low, c.low),
        (RiskTier::Healthy, c.healthy),
    ] {
        if n > 0 {
            summary_parts.push(format!("{}{} {}{RESET}", tier_color(tier), n, tier));
        }
    }
    if !summary_parts.is_empty() {
        out.push_str(&format!("  {}\n\n", summary_parts.join(" | ")));
    }

    // Results table
    if !diagnosis.results.is_empty() {
        out.push_str(&format!(
            "{DIM}  SCORE  TIER      PACKAGE                    CURRENT      LATEST{RESET}\n"
        ));
        out.push_str(&format!(
            "{DIM}  ─────────────────────────────────────────────────────────────────{RESET}\n"
        ));
        for r in &diagnosis.results {
            out.push_str(&format_row(r));
        }
        out.push('\n');
    }

    // Recommendations for the riskiest packages
    let flagged: Vec<&DiagnosisResult> = diagnosis
        .results
        .iter()
        .filter(|r| r.tier > RiskTier::Low || r.recommendations.iter().any(|x| x.is_urgent()))
        .take(DETAIL_LIMIT)
        .collect();
    if !flagged.is_empty() {
        out.push_str(&format!("{BOLD}RECOMMENDATIONS{RESET}\n"));
        for r in flagged {
            out.push_str(&format!("  {BOLD}{}{RESET}\n", r.package));
            for rec in &r.recommendations {
                out.push_str(&format!(
                    "    {}{RESET} {}\n",
                    priority_tag(rec.priority),
                    rec.message
                ));
            }
            let failed: Vec<String> = r
                .signals
                .iter()
                .filter(|s| s.failed)
                .map(|s| s.signal.to_string())
                .collect();
            if !failed.is_empty() {
                out.push_str(&format!(
                    "    {DIM}no data: {}{RESET}\n",
                    failed.join(", ")
                ));
            }
        }
        out.push('\n');
    }

    if !diagnosis.unresolved.is_empty() {
        out.push_str(&format!(
            "{DIM}Not found on the registry: {}{RESET}\n",
            diagnosis.unresolved.join(", ")
        ));
    }

    Ok(out)
}

fn format_row(r: &DiagnosisResult) -> String {
    let color = tier_color(r.tier);
    let name: String = if r.package.chars().count() > 26 {
        format!("{}...", r.package.chars().take(23).collect::<String>())
    } else {
        r.package.clone()
    };
    let cached = if r.from_cache { " (cached)" } else { "" };
    format!(
        "  {color}{:>5.1}  {:<8}{RESET}  {:<26} {:<12} {}{DIM}{}{RESET}\n",
        r.score,
        r.tier.to_string(),
        name,
        r.current_version,
        r.latest_stable_version
            .as_deref()
            .or(r.latest_version.as_deref())
            .unwrap_or("?"),
        cached
    )
}
