use owo_colors::OwoColorize;

use crate::report::finding::{CombinedReport, Severity, COMBINED_SAST};

/// Render a combined report to the terminal with colors
pub fn render(report: &CombinedReport) {
    println!();
    println!(
        "{}  Combined SAST — {} (scanned {})",
        "🔍".bold(),
        report.file_name.bold(),
        report.scan_timestamp.dimmed(),
    );
    println!();

    if report.findings.is_empty() {
        println!("  {}  No security issues found!", "✅".bold());
    }

    for finding in &report.findings {
        let severity_display = format!(" {} ", finding.severity);
        let severity_colored = match finding.severity {
            Severity::Error => severity_display.on_red().white().bold().to_string(),
            Severity::Warning => severity_display.on_yellow().black().bold().to_string(),
            Severity::Info => severity_display.on_blue().white().to_string(),
        };

        println!(
            "  {}  {}:{}",
            severity_colored,
            finding.path.dimmed(),
            finding.start.line.to_string().dimmed(),
        );
        println!("           {}", finding.description.bold());

        let mut tags = vec![format!("{} · {}", finding.source, finding.check_id)];
        if let Some(ref owasp) = finding.owasp_category {
            tags.push(owasp.clone());
        }
        if let Some(ref cwe) = finding.cwe_id {
            tags.push(cwe.clone());
        }
        println!("           {}", tags.join("  ").dimmed());

        println!("           {} {}", "⮕".green(), finding.remediation.green());
        println!();
    }

    // Summary bar
    println!("{}", "━".repeat(60));

    let count = report.severity_count;
    let mut summary_parts = Vec::new();
    if count.error > 0 {
        summary_parts.push(format!("{} error", count.error).red().bold().to_string());
    }
    if count.warning > 0 {
        summary_parts.push(format!("{} warning", count.warning).yellow().bold().to_string());
    }
    if count.info > 0 {
        summary_parts.push(format!("{} info", count.info).blue().to_string());
    }
    if summary_parts.is_empty() {
        summary_parts.push("none".to_string());
    }

    println!(
        " {} unique findings: {}",
        count.total().to_string().bold(),
        summary_parts.join(", ")
    );
    println!(
        " Security score: {}",
        format!("{:.1}/10", report.security_score).bold()
    );

    let scores = report.scan_metadata.individual_scores;
    println!(
        " {}",
        format!(
            "Semgrep {:.1} · ShiftLeft {:.1} · CodeQL {:.1}",
            scores.semgrep, scores.shiftleft, scores.codeql
        )
        .dimmed()
    );

    println!("{}", "━".repeat(60));
    println!();
}

/// Render a stored report. Reports written by this pipeline get the full
/// combined view; anything else (e.g. "AI", "SAST & AI", a bare tool
/// name) is shown compactly with its scan_type printed verbatim.
pub fn render_stored(report: &CombinedReport) {
    if report.scan_metadata.scan_type == COMBINED_SAST {
        render(report);
        return;
    }

    println!();
    println!(
        "{}  {} scan — {} ({})",
        "🗂".bold(),
        report.scan_metadata.scan_type,
        report.file_name.bold(),
        report.scan_timestamp.dimmed(),
    );
    println!();

    for finding in &report.findings {
        println!(
            "  [{}] {}:{}  {}",
            finding.severity,
            finding.path.dimmed(),
            finding.start.line,
            finding.message
        );
    }

    println!();
    println!(
        " {} findings ({} sources)",
        report.findings.len().to_string().bold(),
        report.scan_metadata.scan_sources.len()
    );
    println!();
}
