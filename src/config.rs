use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::scanner::ScannerKind;

/// Trisast configuration (loaded from .trisast.toml)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrisastConfig {
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// Semgrep scan endpoint (stage one, accepts custom rules)
    #[serde(default = "default_semgrep_url")]
    pub semgrep: String,

    /// ShiftLeft scan endpoint (stage two)
    #[serde(default = "default_shiftleft_url")]
    pub shiftleft: String,

    /// CodeQL scan endpoint (stage three)
    #[serde(default = "default_codeql_url")]
    pub codeql: String,

    /// Result store endpoint; unset disables persistence
    #[serde(default)]
    pub store: Option<String>,
}

impl EndpointsConfig {
    pub fn scanner_url(&self, kind: ScannerKind) -> &str {
        match kind {
            ScannerKind::Semgrep => &self.semgrep,
            ScannerKind::ShiftLeft => &self.shiftleft,
            ScannerKind::CodeQl => &self.codeql,
        }
    }
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        EndpointsConfig {
            semgrep: default_semgrep_url(),
            shiftleft: default_shiftleft_url(),
            codeql: default_codeql_url(),
            store: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds (scans can take a while)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig { timeout_secs: default_timeout_secs() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pause between consecutive successful stages, in milliseconds.
    /// Keeps per-stage progress visible; zero disables it.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig { settle_ms: default_settle_ms() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format: "terminal" or "json"
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig { format: default_format() }
    }
}

fn default_semgrep_url() -> String {
    "http://localhost:8000/api/scan/semgrep".to_string()
}

fn default_shiftleft_url() -> String {
    "http://localhost:8000/api/scan/shiftleft".to_string()
}

fn default_codeql_url() -> String {
    "http://localhost:8000/api/scan/codeql".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_settle_ms() -> u64 {
    500
}

fn default_format() -> String {
    "terminal".to_string()
}

impl TrisastConfig {
    /// Try to load .trisast.toml from the given directory or its parents
    pub fn load(start: &Path) -> Option<Self> {
        let config_path = find_config_file(start)?;
        debug!("Found config: {}", config_path.display());

        match std::fs::read_to_string(&config_path) {
            Ok(content) => match toml::from_str::<TrisastConfig>(&content) {
                Ok(config) => {
                    info!("Loaded config from {}", config_path.display());
                    Some(config)
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}", config_path.display(), e);
                    None
                }
            },
            Err(e) => {
                debug!("Could not read {}: {}", config_path.display(), e);
                None
            }
        }
    }
}

/// Walk up from the start path to find .trisast.toml
fn find_config_file(start: &Path) -> Option<std::path::PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let config = current.join(".trisast.toml");
        if config.exists() {
            return Some(config);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Create a default .trisast.toml in the current directory
pub fn init_config() -> Result<()> {
    let config_path = std::env::current_dir()?.join(".trisast.toml");

    if config_path.exists() {
        println!("⚠️  .trisast.toml already exists in this directory");
        return Ok(());
    }

    let default_config = r#"# Trisast pipeline configuration

[endpoints]
# Scanner endpoints, one per tool
semgrep = "http://localhost:8000/api/scan/semgrep"
shiftleft = "http://localhost:8000/api/scan/shiftleft"
codeql = "http://localhost:8000/api/scan/codeql"

# Result store endpoint. Leave unset to keep reports local only.
# store = "http://localhost:8000/api/scans"

[http]
# Per-request timeout in seconds
timeout_secs = 300

[pipeline]
# Pause between scanner stages in milliseconds (0 = none)
settle_ms = 500

[output]
# Default output format: "terminal" or "json"
format = "terminal"
"#;

    std::fs::write(&config_path, default_config)?;
    println!("✅ Created .trisast.toml");
    println!("   Edit it to point at your scanner endpoints.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_gets_all_defaults() {
        let config: TrisastConfig = toml::from_str("").unwrap();
        assert_eq!(config.http.timeout_secs, 300);
        assert_eq!(config.pipeline.settle_ms, 500);
        assert_eq!(config.output.format, "terminal");
        assert!(config.endpoints.store.is_none());
        assert!(config.endpoints.semgrep.contains("semgrep"));
    }

    #[test]
    fn partial_config_keeps_defaults_for_the_rest() {
        let config: TrisastConfig = toml::from_str(
            r#"
            [endpoints]
            semgrep = "https://scan.example.com/semgrep"
            store = "https://scan.example.com/results"

            [pipeline]
            settle_ms = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.endpoints.semgrep, "https://scan.example.com/semgrep");
        assert_eq!(config.endpoints.store.as_deref(), Some("https://scan.example.com/results"));
        assert!(config.endpoints.codeql.contains("codeql"));
        assert_eq!(config.pipeline.settle_ms, 0);
        assert_eq!(config.http.timeout_secs, 300);
    }

    #[test]
    fn scanner_url_maps_each_stage() {
        let endpoints = EndpointsConfig::default();
        assert!(endpoints.scanner_url(ScannerKind::Semgrep).ends_with("semgrep"));
        assert!(endpoints.scanner_url(ScannerKind::ShiftLeft).ends_with("shiftleft"));
        assert!(endpoints.scanner_url(ScannerKind::CodeQl).ends_with("codeql"));
    }
}
