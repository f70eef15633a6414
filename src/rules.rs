//! Custom Semgrep rule validation.
//!
//! Rules are forwarded verbatim to the first pipeline stage, but only
//! after passing a local shape check: valid JSON with a top-level
//! `rules` array. Anything else is rejected before a single byte goes
//! over the wire.

use serde_json::Value;

use crate::error::PipelineError;

/// Validated custom rules, kept as the original JSON text so the scanner
/// receives exactly what the user wrote.
#[derive(Debug, Clone)]
pub struct CustomRules {
    raw: String,
}

impl CustomRules {
    pub fn parse(raw: &str) -> Result<Self, PipelineError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| PipelineError::InvalidRules(format!("not valid JSON: {e}")))?;

        match value.get("rules") {
            Some(Value::Array(_)) => Ok(CustomRules { raw: raw.to_string() }),
            Some(_) => Err(PipelineError::InvalidRules(
                "`rules` must be an array".to_string(),
            )),
            None => Err(PipelineError::InvalidRules(
                "missing a top-level `rules` array".to_string(),
            )),
        }
    }

    pub fn as_json(&self) -> &str {
        &self.raw
    }
}
