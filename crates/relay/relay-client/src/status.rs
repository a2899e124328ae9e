//! Status code inference.
//!
//! Transport failures carry no HTTP status, and many chains answer relays with
//! a 200 envelope whatever happened downstream. Both cases are resolved from
//! ordered tables; the first entry that matches wins.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Status reported when a call failed before any node answered.
pub const DEFAULT_STATUS_CODE: u16 = 500;

pub const STATUS_OK: u16 = 200;

/// Status reported for a successful relay whose answer carries neither a
/// success marker nor a recognizable status.
pub const UNKNOWN_SUCCESS_STATUS: u16 = 202;

/// Transport error text (matched case-insensitively) to status code.
pub const TRANSPORT_STATUS_TABLE: &[(&str, u16)] = &[
    ("deadline exceeded", 504),
    ("timed out", 504),
    ("timeout", 504),
    ("canceled", 499),
    ("cancelled", 499),
    ("no such host", 502),
    ("dns error", 502),
    ("failed to lookup address", 502),
    ("connection refused", 503),
    ("connection reset", 502),
    ("broken pipe", 502),
    ("unexpected eof", 502),
    ("tls", 502),
    ("certificate", 502),
    ("body too large", 502),
];

/// Patterns recovering a status code from a relay answer. The first capture
/// group holds the code.
pub const SUCCESS_STATUS_PATTERNS: &[&str] = &[
    r#""(?:status_code|statusCode)"\s*:\s*"?([1-5]\d{2})\b"#,
    r#""status"\s*:\s*"?([1-5]\d{2})\b"#,
    r#""code"\s*:\s*"?([1-5]\d{2})\b"#,
    r"HTTP/\d(?:\.\d)?\s+([1-5]\d{2})\b",
];

static SUCCESS_STATUS_PROBES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    SUCCESS_STATUS_PATTERNS
        .iter()
        .map(|pattern| Regex::new(pattern).expect("status probe patterns are valid"))
        .collect()
});

/// Status for a transport failure described by `message`.
pub fn transport_status(message: &str) -> u16 {
    let message = message.to_lowercase();
    TRANSPORT_STATUS_TABLE
        .iter()
        .find(|(needle, _)| message.contains(needle))
        .map(|(_, status)| *status)
        .unwrap_or(DEFAULT_STATUS_CODE)
}

/// Status for the `response` text of a successful relay.
pub fn success_status(response: &str) -> u16 {
    if has_result_marker(response) {
        return STATUS_OK;
    }
    probe_status(response).unwrap_or(UNKNOWN_SUCCESS_STATUS)
}

/// Runs the probe table over `response`.
pub fn probe_status(response: &str) -> Option<u16> {
    SUCCESS_STATUS_PROBES.iter().find_map(|probe| {
        probe
            .captures(response)
            .and_then(|captures| captures.get(1))
            .and_then(|code| code.as_str().parse().ok())
    })
}

/// A JSON-RPC style `result` member, at the top level or in any element of a
/// batch answer.
fn has_result_marker(response: &str) -> bool {
    let has_result = |value: &Value| value.get("result").is_some();
    match serde_json::from_str::<Value>(response) {
        Ok(Value::Array(items)) => items.iter().any(has_result),
        Ok(value) => has_result(&value),
        Err(_) => false,
    }
}
