pub mod http;

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

use crate::report::finding::RawFinding;
use crate::rules::CustomRules;

/// The three scanners driven by the pipeline, in their fixed run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScannerKind {
    Semgrep,
    ShiftLeft,
    CodeQl,
}

impl ScannerKind {
    /// Fixed pipeline order. Stage one is the only stage that accepts
    /// custom rules.
    pub const ORDER: [ScannerKind; 3] =
        [ScannerKind::Semgrep, ScannerKind::ShiftLeft, ScannerKind::CodeQl];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScannerKind::Semgrep => "Semgrep",
            ScannerKind::ShiftLeft => "ShiftLeft",
            ScannerKind::CodeQl => "CodeQL",
        }
    }

    /// Reverse of `as_str`, for records that carry the source as text.
    pub fn from_name(name: &str) -> Option<Self> {
        ScannerKind::ORDER
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(name))
    }

    /// The analysis technique each scanner is known for. Quoted in
    /// enriched finding descriptions.
    pub fn technique(&self) -> &'static str {
        match self {
            ScannerKind::Semgrep => "pattern matching",
            ScannerKind::ShiftLeft => "flow analysis",
            ScannerKind::CodeQl => "semantic analysis",
        }
    }
}

impl std::fmt::Display for ScannerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The code artifact submitted to every scanner.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// File name reported to the scanners and stamped into the report
    pub file_name: String,
    /// Raw file contents
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read artifact {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("artifact")
            .to_string();
        Ok(Artifact { file_name, bytes })
    }
}

/// Successful scanner response: `{vulnerabilities, security_score}`.
/// A score of zero means the scanner did not produce one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScanOutput {
    #[serde(default)]
    pub vulnerabilities: Vec<RawFinding>,
    #[serde(default)]
    pub security_score: f64,
}

/// A failed scanner round trip, carrying the single user-visible message
/// for the run (server-provided detail when available, otherwise a
/// stage-specific generic).
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn network(kind: ScannerKind, cause: impl std::fmt::Display) -> Self {
        TransportError(format!("{kind} scan failed: {cause}"))
    }

    pub fn generic(kind: ScannerKind, status: u16) -> Self {
        TransportError(format!("{kind} scan failed (HTTP {status})"))
    }
}

/// One scanner round trip, split at the phase boundary the pipeline
/// tracks: `upload` transmits the artifact, `collect` blocks until the
/// scanner's findings are in hand.
pub trait ScannerClient {
    type Ticket;

    /// Send the artifact to the scanner. `rules` is only ever `Some` for
    /// the Semgrep stage.
    fn upload(
        &self,
        kind: ScannerKind,
        artifact: &Artifact,
        rules: Option<&CustomRules>,
    ) -> Result<Self::Ticket, TransportError>;

    /// Wait for the scanner to finish and parse its findings.
    fn collect(&self, kind: ScannerKind, ticket: Self::Ticket)
        -> Result<ScanOutput, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scanner_order_is_fixed() {
        assert_eq!(
            ScannerKind::ORDER,
            [ScannerKind::Semgrep, ScannerKind::ShiftLeft, ScannerKind::CodeQl]
        );
    }

    #[test]
    fn from_name_round_trips() {
        for kind in ScannerKind::ORDER {
            assert_eq!(ScannerKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(ScannerKind::from_name("codeql"), Some(ScannerKind::CodeQl));
        assert_eq!(ScannerKind::from_name("sonarqube"), None);
    }

    #[test]
    fn techniques_match_scanners() {
        assert_eq!(ScannerKind::Semgrep.technique(), "pattern matching");
        assert_eq!(ScannerKind::ShiftLeft.technique(), "flow analysis");
        assert_eq!(ScannerKind::CodeQl.technique(), "semantic analysis");
    }

    #[test]
    fn scan_output_tolerates_missing_fields() {
        let output: ScanOutput = serde_json::from_str("{}").unwrap();
        assert!(output.vulnerabilities.is_empty());
        assert_eq!(output.security_score, 0.0);
    }
}
