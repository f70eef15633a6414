//! Aggregation of the three raw finding sets into one combined report.
//!
//! Pure given its inputs: no I/O happens anywhere in the pass. Findings
//! are deduplicated by composite key, severity is reconciled upward only,
//! and every retained entry is enriched via the keyword tables.

use std::collections::HashMap;

use crate::enrich;
use crate::report::finding::{
    CombinedReport, EnrichedFinding, IndividualScores, RawFinding, ScanMetadata, SeverityCount,
    COMBINED_SAST, DEFAULT_MESSAGE, DEFAULT_PATH,
};
use crate::scanner::ScannerKind;

/// One scanner's raw output, tagged with its source.
#[derive(Debug, Clone)]
pub struct ScannerRun {
    pub kind: ScannerKind,
    pub findings: Vec<RawFinding>,
    pub score: f64,
}

/// Merge the scanner runs into an immutable combined report.
///
/// Runs are processed in the order given (the pipeline hands them over in
/// fixed scanner order), findings within a run in array order. The output
/// list keeps first-insertion order; it is not re-sorted.
pub fn combine(file_name: &str, runs: &[ScannerRun], timestamp: String) -> CombinedReport {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut findings: Vec<EnrichedFinding> = Vec::new();
    let mut scores = IndividualScores::default();

    for run in runs {
        scores.set(run.kind, run.score);
        for raw in &run.findings {
            let key = raw.composite_key();
            match slots.get(&key) {
                None => {
                    let mut entry = EnrichedFinding::from_raw(raw, run.kind);
                    enrich::apply(&mut entry, run.kind);
                    slots.insert(key, findings.len());
                    findings.push(entry);
                }
                Some(&slot) => {
                    // Upgrade only; first-seen wins on ties and downgrades.
                    if raw.normalized_severity() > findings[slot].severity {
                        let mut entry = EnrichedFinding::from_raw(raw, run.kind);
                        enrich::apply(&mut entry, run.kind);
                        findings[slot] = entry;
                    }
                }
            }
        }
    }

    let severity_count = SeverityCount::from_findings(&findings);
    let security_score = mean_nonzero(&scores.as_array());

    CombinedReport {
        file_name: file_name.to_string(),
        findings,
        severity_count,
        security_score,
        scan_timestamp: timestamp,
        scan_metadata: ScanMetadata {
            scan_type: COMBINED_SAST.to_string(),
            scan_sources: ScannerKind::ORDER.iter().map(|k| k.as_str().to_string()).collect(),
            individual_scores: scores,
        },
    }
}

/// Mean over the nonzero scores. Zero means "did not run", not a perfect
/// or failing grade, so it never drags the average down.
fn mean_nonzero(scores: &[f64]) -> f64 {
    let contributing: Vec<f64> = scores.iter().copied().filter(|s| *s != 0.0).collect();
    if contributing.is_empty() {
        return 0.0;
    }
    contributing.iter().sum::<f64>() / contributing.len() as f64
}

/// Defensive second pass run before a report is handed to the result
/// store: guarantee required fields even if an upstream defaulting path
/// was skipped. Independent of the ingestion-time defaulting.
pub fn sanitize_findings(findings: &mut [EnrichedFinding]) {
    for f in findings {
        if f.path.is_empty() {
            f.path = DEFAULT_PATH.to_string();
        }
        if f.message.is_empty() {
            f.message = DEFAULT_MESSAGE.to_string();
        }
        if f.description.is_empty() {
            f.description = f.message.clone();
        }
        if f.remediation.is_empty() {
            let kind = ScannerKind::from_name(&f.source).unwrap_or(ScannerKind::Semgrep);
            f.remediation = enrich::remediation(&f.check_id, &f.message, kind, f.severity);
        }
        if f.id.is_empty() {
            f.id = EnrichedFinding::generate_id(&format!("{}:{}:{}", f.check_id, f.path, f.start.line));
        }
    }
}
