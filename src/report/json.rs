use anyhow::Result;

use crate::report::finding::CombinedReport;

/// Render a combined report as pretty-printed JSON
pub fn render(report: &CombinedReport) -> Result<String> {
    let json = serde_json::to_string_pretty(report)?;
    Ok(json)
}
