use std::time::Duration;

use anyhow::Result;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use tracing::debug;

use crate::config::EndpointsConfig;
use crate::rules::CustomRules;
use crate::scanner::{Artifact, ScanOutput, ScannerClient, ScannerKind, TransportError};

/// Error envelope the scanner services return on non-success responses.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    detail: String,
}

/// Blocking HTTP client shared by all three scanner stages. The stages
/// differ only in endpoint URL and whether custom rules are attached.
pub struct HttpScannerClient {
    http: Client,
    endpoints: EndpointsConfig,
}

impl HttpScannerClient {
    pub fn new(endpoints: EndpointsConfig, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(HttpScannerClient { http, endpoints })
    }
}

impl ScannerClient for HttpScannerClient {
    type Ticket = Response;

    fn upload(
        &self,
        kind: ScannerKind,
        artifact: &Artifact,
        rules: Option<&CustomRules>,
    ) -> Result<Response, TransportError> {
        let url = self.endpoints.scanner_url(kind);
        debug!("uploading {} to {}", artifact.file_name, url);

        let part = Part::bytes(artifact.bytes.clone()).file_name(artifact.file_name.clone());
        let mut form = Form::new().part("file", part);
        if let Some(rules) = rules {
            form = form.text("rules", rules.as_json().to_string());
        }

        self.http
            .post(url)
            .multipart(form)
            .send()
            .map_err(|e| TransportError::network(kind, e))
    }

    fn collect(&self, kind: ScannerKind, response: Response) -> Result<ScanOutput, TransportError> {
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| TransportError::network(kind, e))?;

        if status.is_success() {
            serde_json::from_str(&body)
                .map_err(|_| TransportError(format!("{kind} returned an unreadable response")))
        } else {
            Err(TransportError(failure_message(kind, status.as_u16(), &body)))
        }
    }
}

/// Prefer the server-provided `detail`; fall back to a stage-specific
/// generic when the envelope does not parse.
fn failure_message(kind: ScannerKind, status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.detail.is_empty() => envelope.detail,
        _ => TransportError::generic(kind, status).0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_message_prefers_server_detail() {
        let msg = failure_message(
            ScannerKind::ShiftLeft,
            422,
            r#"{"detail": "artifact exceeds size limit"}"#,
        );
        assert_eq!(msg, "artifact exceeds size limit");
    }

    #[test]
    fn failure_message_falls_back_on_unparseable_body() {
        let msg = failure_message(ScannerKind::CodeQl, 502, "<html>Bad Gateway</html>");
        assert_eq!(msg, "CodeQL scan failed (HTTP 502)");
    }

    #[test]
    fn failure_message_falls_back_on_empty_detail() {
        let msg = failure_message(ScannerKind::Semgrep, 500, r#"{"detail": ""}"#);
        assert_eq!(msg, "Semgrep scan failed (HTTP 500)");
    }
}
