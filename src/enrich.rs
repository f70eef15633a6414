//! Enrichment rules: pure keyword tables mapping a finding to description
//! text, an OWASP category, a CWE id, and remediation guidance.
//!
//! Every table is an ordered list evaluated top to bottom, first match
//! wins. Matching is case-insensitive over `check_id` and `message`
//! together, so the precedence is an explicit artifact rather than being
//! buried in branch order.

use crate::report::finding::{EnrichedFinding, Severity};
use crate::scanner::ScannerKind;

/// An ordered keyword rule: any keyword hit selects `value`.
type KeywordRule = (&'static [&'static str], &'static str);

/// Category sentences appended to the raw message.
const CATEGORY_NOTES: &[KeywordRule] = &[
    (
        &["sql injection", "sql-injection", "sqli", "sql"],
        "This may allow attackers to read or modify database contents by injecting crafted SQL.",
    ),
    (
        &["cross-site scripting", "cross site scripting", "xss"],
        "This may allow attackers to execute scripts in a victim's browser session.",
    ),
    (
        &["command injection", "command-injection", "os command"],
        "This may allow attackers to execute arbitrary commands on the host system.",
    ),
    (
        &["path traversal", "path-traversal", "directory traversal", "traversal"],
        "This may allow attackers to access files outside the intended directory.",
    ),
    (
        &["server-side request forgery", "ssrf"],
        "This may allow attackers to make the server issue requests to internal resources.",
    ),
];

/// OWASP Top 10 mapping. "command injection" lands on A1 through the
/// bare "injection" keyword.
const OWASP_RULES: &[KeywordRule] = &[
    (&["injection", "sql"], "A1:2021-Injection"),
    (&["auth", "password"], "A2:2021-Broken Authentication"),
    (&["xss", "cross-site scripting"], "A3:2021-XSS"),
    (
        &["access-control", "access control", "authorization"],
        "A5:2021-Broken Access Control",
    ),
    (&["serializ"], "A8:2021-Insecure Deserialization"),
    (&["log"], "A9:2021-Insufficient Logging"),
];

/// CWE mapping. "sql" is listed first so `sql-injection-*` checks map to
/// CWE-89 rather than the command-injection entry.
const CWE_RULES: &[KeywordRule] = &[
    (&["sql"], "CWE-89"),
    (&["command injection", "command-injection", "os command"], "CWE-78"),
    (&["xss", "cross-site scripting"], "CWE-79"),
    (&["path traversal", "path-traversal", "traversal"], "CWE-22"),
    (&["ssrf", "server-side request forgery"], "CWE-918"),
    (&["hardcoded", "hard-coded"], "CWE-798"),
];

/// Category-specific remediation guidance. SSRF is listed before CSRF
/// with non-overlapping keywords so "cross-site request forgery" cannot
/// be swallowed by the SSRF entry.
const REMEDIATION_RULES: &[KeywordRule] = &[
    (
        &["sql injection", "sql-injection", "sqli", "sql"],
        "Use parameterized queries or prepared statements; never build SQL from user input by concatenation.",
    ),
    (
        &["cross-site scripting", "xss"],
        "Encode output for its HTML context and sanitize untrusted input with a vetted library.",
    ),
    (
        &["command injection", "command-injection", "os command"],
        "Avoid passing user input to shell interpreters; invoke commands with an argument vector and strict allow-lists.",
    ),
    (
        &["path traversal", "path-traversal", "traversal"],
        "Canonicalize paths and verify they stay within the intended base directory before use.",
    ),
    (
        &["hardcoded", "hard-coded", "credential"],
        "Remove embedded secrets, rotate them, and load credentials from a secret manager or the environment.",
    ),
    (
        &["ssrf", "server-side request forgery"],
        "Validate and allow-list outbound request targets; block requests to internal address ranges.",
    ),
    (
        &["deserial", "serializ"],
        "Do not deserialize untrusted data; prefer safe formats such as JSON and validate against a schema.",
    ),
    (
        &["crypt", "cipher", "hash"],
        "Use modern, well-reviewed cryptographic algorithms and library defaults; avoid MD5, SHA-1, and homegrown schemes.",
    ),
    (
        &["csrf", "cross-site request forgery"],
        "Require anti-CSRF tokens on state-changing requests and validate the Origin header.",
    ),
    (
        &["auth", "password", "session"],
        "Enforce strong password storage (bcrypt or Argon2), apply rate limiting, and harden session management.",
    ),
    (
        &["cors", "origin"],
        "Restrict Access-Control-Allow-Origin to trusted origins and avoid wildcard policies with credentials.",
    ),
];

const GENERIC_REMEDIATION: &str =
    "Review the flagged code and apply secure coding practices appropriate to the finding.";

/// First matching rule over the lowercased haystack.
fn first_match(rules: &[KeywordRule], haystack: &str) -> Option<&'static str> {
    rules
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| haystack.contains(k)))
        .map(|(_, value)| *value)
}

fn haystack(check_id: &str, message: &str) -> String {
    format!("{} {}", check_id, message).to_lowercase()
}

/// Synthesize the description: raw message, then the first matching
/// category note, then a sentence naming the source's technique.
pub fn describe(check_id: &str, message: &str, source: ScannerKind) -> String {
    let mut description = message.to_string();
    if let Some(note) = first_match(CATEGORY_NOTES, &haystack(check_id, message)) {
        description.push(' ');
        description.push_str(note);
    }
    description.push(' ');
    description.push_str(&format!(
        "{} identified this issue through {}.",
        source,
        source.technique()
    ));
    description
}

pub fn owasp_category(check_id: &str, message: &str) -> Option<&'static str> {
    first_match(OWASP_RULES, &haystack(check_id, message))
}

pub fn cwe_id(check_id: &str, message: &str) -> Option<&'static str> {
    first_match(CWE_RULES, &haystack(check_id, message))
}

/// Remediation guidance, always non-empty. Falls back from the category
/// table to a source+keyword check, then to severity wording, then to a
/// generic sentence.
pub fn remediation(
    check_id: &str,
    message: &str,
    source: ScannerKind,
    severity: Severity,
) -> String {
    let text = haystack(check_id, message);
    if let Some(guidance) = first_match(REMEDIATION_RULES, &text) {
        return guidance.to_string();
    }

    let source_hint = match source {
        ScannerKind::Semgrep if text.contains("pattern") => Some(
            "Review the matched pattern and refactor the flagged code to remove the unsafe construct.",
        ),
        ScannerKind::CodeQl if text.contains("taint") => Some(
            "Trace the tainted data flow and sanitize or validate input before it reaches the sink.",
        ),
        ScannerKind::ShiftLeft if text.contains("leak") => Some(
            "Audit the reported data flow and ensure sensitive values are not exposed outside trusted boundaries.",
        ),
        _ => None,
    };
    if let Some(guidance) = source_hint {
        return guidance.to_string();
    }

    match severity {
        Severity::Error => {
            "Address this high-severity issue promptly; it is likely exploitable.".to_string()
        }
        Severity::Warning => {
            "Review this issue and fix it as part of regular hardening work.".to_string()
        }
        Severity::Info => GENERIC_REMEDIATION.to_string(),
    }
}

/// Fill every enrichment field of a freshly ingested finding.
pub fn apply(finding: &mut EnrichedFinding, source: ScannerKind) {
    finding.description = describe(&finding.check_id, &finding.message, source);
    finding.owasp_category = owasp_category(&finding.check_id, &finding.message).map(String::from);
    finding.cwe_id = cwe_id(&finding.check_id, &finding.message).map(String::from);
    finding.remediation =
        remediation(&finding.check_id, &finding.message, source, finding.severity);
}
