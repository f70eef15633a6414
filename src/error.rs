use thiserror::Error;

use crate::scanner::ScannerKind;

/// The user-visible failures of a pipeline run. Exactly one of these
/// surfaces per run; persistence failures are logged and swallowed, and
/// defaulting during enrichment is never an error.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A scanner call returned a non-success response or failed at the
    /// network level. The message is the server-provided detail when one
    /// was parseable, else a stage-specific generic.
    #[error("{message}")]
    Transport {
        stage: ScannerKind,
        message: String,
    },

    /// The user-supplied custom rules were rejected before any network
    /// call was made.
    #[error("invalid custom rules: {0}")]
    InvalidRules(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_displays_only_the_message() {
        let err = PipelineError::Transport {
            stage: ScannerKind::ShiftLeft,
            message: "ShiftLeft scan failed (HTTP 502)".to_string(),
        };
        assert_eq!(err.to_string(), "ShiftLeft scan failed (HTTP 502)");
    }

    #[test]
    fn invalid_rules_error_names_the_cause() {
        let err = PipelineError::InvalidRules("missing a top-level `rules` array".to_string());
        assert!(err.to_string().contains("rules"));
    }
}
