use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::scanner::ScannerKind;

pub const DEFAULT_CHECK_ID: &str = "unknown";
pub const DEFAULT_PATH: &str = "Unknown";
pub const DEFAULT_MESSAGE: &str = "Unknown vulnerability";

/// Discriminator stamped into every report this pipeline produces. Other
/// pipelines write other values ("AI", "SAST & AI", bare tool names);
/// those must be displayed unchanged.
pub const COMBINED_SAST: &str = "Combined SAST";

/// Normalized severity of a finding. Ordering matters: on a dedup
/// collision severity may only move upward.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Fold the scanners' severity dialects into the three normalized
    /// levels. Unknown vocabulary degrades to `Info` rather than erroring.
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "ERROR" | "CRITICAL" | "HIGH" => Severity::Error,
            "WARNING" | "WARN" | "MEDIUM" => Severity::Warning,
            _ => Severity::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Info => "INFO",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Position within the scanned file (0 = unknown line).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col: Option<u32>,
}

/// Nested metadata bag some scanners attach to a finding. Its severity
/// field takes precedence over the top-level one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FindingExtra {
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Raw per-vulnerability record exactly as a scanner reported it. Every
/// field is optional; defaults are applied at ingestion.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFinding {
    #[serde(default)]
    pub check_id: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub start: Option<Position>,
    #[serde(default)]
    pub end: Option<Position>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub extra: Option<FindingExtra>,
}

impl RawFinding {
    /// Dedup identity: `check_id:path:start.line`. Computed on the raw
    /// record, so it is the same before and after source tagging.
    pub fn composite_key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.check_id.as_deref().unwrap_or(DEFAULT_CHECK_ID),
            self.path.as_deref().unwrap_or(DEFAULT_PATH),
            self.start.map(|p| p.line).unwrap_or(0),
        )
    }

    /// Severity precedence: nested metadata field, then top-level field,
    /// then `Info`.
    pub fn normalized_severity(&self) -> Severity {
        self.extra
            .as_ref()
            .and_then(|e| e.severity.as_deref())
            .or(self.severity.as_deref())
            .map(Severity::from_str)
            .unwrap_or_default()
    }
}

/// A finding after normalization, deduplication, and enrichment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichedFinding {
    /// Deterministic ID (hash-based), e.g. "TRI-a1b2c3d4"
    pub id: String,

    /// Which scanner produced the retained record
    pub source: String,

    /// Rule that triggered the finding
    pub check_id: String,

    /// File the issue was found in
    pub path: String,

    pub start: Position,
    pub end: Position,

    /// Raw scanner message
    pub message: String,

    /// Normalized severity
    pub severity: Severity,

    /// Synthesized description (message + category note + technique)
    pub description: String,

    /// Actionable guidance, always recomputed during aggregation
    pub remediation: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub owasp_category: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwe_id: Option<String>,
}

impl EnrichedFinding {
    /// Ingest a raw finding, applying field defaults and severity
    /// normalization. Enrichment fields are filled by the aggregation
    /// pass.
    pub fn from_raw(raw: &RawFinding, source: ScannerKind) -> Self {
        let check_id = raw
            .check_id
            .clone()
            .unwrap_or_else(|| DEFAULT_CHECK_ID.to_string());
        let path = raw.path.clone().unwrap_or_else(|| DEFAULT_PATH.to_string());
        let message = raw
            .message
            .clone()
            .or_else(|| raw.extra.as_ref().and_then(|e| e.message.clone()))
            .unwrap_or_else(|| DEFAULT_MESSAGE.to_string());

        EnrichedFinding {
            id: Self::generate_id(&raw.composite_key()),
            source: source.as_str().to_string(),
            check_id,
            path,
            start: raw.start.unwrap_or_default(),
            end: raw.end.unwrap_or_default(),
            message,
            severity: raw.normalized_severity(),
            description: String::new(),
            remediation: String::new(),
            owasp_category: None,
            cwe_id: None,
        }
    }

    /// Generate a deterministic ID from the composite key
    pub fn generate_id(composite_key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(composite_key.as_bytes());
        let hex = format!("{:x}", hasher.finalize());
        format!("TRI-{}", &hex[..8])
    }
}

/// Per-severity totals over the final finding set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", default)]
pub struct SeverityCount {
    pub error: usize,
    pub warning: usize,
    pub info: usize,
}

impl SeverityCount {
    pub fn from_findings(findings: &[EnrichedFinding]) -> Self {
        let mut count = SeverityCount::default();
        for f in findings {
            match f.severity {
                Severity::Error => count.error += 1,
                Severity::Warning => count.warning += 1,
                Severity::Info => count.info += 1,
            }
        }
        count
    }

    pub fn total(&self) -> usize {
        self.error + self.warning + self.info
    }
}

/// Raw per-scanner scores, zeros included (zero means "did not run")
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndividualScores {
    pub semgrep: f64,
    pub shiftleft: f64,
    pub codeql: f64,
}

impl IndividualScores {
    pub fn set(&mut self, kind: ScannerKind, score: f64) {
        match kind {
            ScannerKind::Semgrep => self.semgrep = score,
            ScannerKind::ShiftLeft => self.shiftleft = score,
            ScannerKind::CodeQl => self.codeql = score,
        }
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.semgrep, self.shiftleft, self.codeql]
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanMetadata {
    pub scan_type: String,
    pub scan_sources: Vec<String>,
    pub individual_scores: IndividualScores,
}

/// The final merged artifact for one pipeline run. Immutable once
/// constructed; a new run produces a new report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CombinedReport {
    pub file_name: String,

    /// Unique enriched findings in first-insertion order
    pub findings: Vec<EnrichedFinding>,

    pub severity_count: SeverityCount,

    /// Mean of the nonzero per-scanner scores
    pub security_score: f64,

    pub scan_timestamp: String,

    pub scan_metadata: ScanMetadata,
}

impl CombinedReport {
    /// Check if there are findings at or above a severity threshold
    pub fn has_findings_at_or_above(&self, threshold: Severity) -> bool {
        self.findings.iter().any(|f| f.severity >= threshold)
    }
}
