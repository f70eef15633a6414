//! Result store client.
//!
//! Persistence is fire-and-forget relative to the returned report: the
//! pipeline logs a warning on failure and hands the caller the
//! already-computed in-memory result regardless.

use std::time::Duration;

use anyhow::Result;
use reqwest::blocking::Client;
use thiserror::Error;
use tracing::debug;

use crate::report::finding::CombinedReport;
use crate::report::merger;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("result store rejected the report (HTTP {0})")]
    Rejected(u16),
    #[error("result store unreachable: {0}")]
    Unreachable(String),
}

pub trait ReportStore {
    fn persist(&self, report: &CombinedReport) -> Result<(), StoreError>;
}

/// POSTs the report as JSON to the configured endpoint. Findings are
/// re-validated defensively before serialization; the caller's report is
/// left untouched.
pub struct HttpStore {
    http: Client,
    url: String,
}

impl HttpStore {
    pub fn new(url: String, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(HttpStore { http, url })
    }
}

impl ReportStore for HttpStore {
    fn persist(&self, report: &CombinedReport) -> Result<(), StoreError> {
        let mut payload = report.clone();
        merger::sanitize_findings(&mut payload.findings);

        debug!("persisting report for {} to {}", payload.file_name, self.url);
        let response = self
            .http
            .post(&self.url)
            .json(&payload)
            .send()
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(StoreError::Rejected(response.status().as_u16()))
        }
    }
}

/// Used when persistence is disabled (`--no-persist` or no store
/// endpoint configured).
pub struct NoStore;

impl ReportStore for NoStore {
    fn persist(&self, _report: &CombinedReport) -> Result<(), StoreError> {
        debug!("persistence disabled, keeping report in memory only");
        Ok(())
    }
}
