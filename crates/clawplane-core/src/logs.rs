//! `openclaw logs` invocations.

use serde_json::json;

pub const DEFAULT_LINES: u32 = 100;
pub const MAX_LINES: u32 = 10_000;

pub fn recent_tokens(lines: Option<u32>) -> Vec<String> {
    let lines = lines.unwrap_or(DEFAULT_LINES).clamp(1, MAX_LINES);
    vec!["logs".to_string(), "--lines".to_string(), lines.to_string()]
}

pub fn follow_tokens() -> Vec<String> {
    ["logs", "--follow"].map(String::from).to_vec()
}

/// A stderr line of the log tail, shaped like a log entry so the dashboard
/// can render it in red.
pub fn stderr_entry(line: &str) -> String {
    json!({ "level": "error", "message": line }).to_string()
}
