//! Gateway lifecycle commands and how their output is read.

use clawplane_runtime::{as_json, CliResult, Payload};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::ValidationError;
use crate::validate::require_word;

pub const GATEWAY_PORT: u16 = 18789;
pub const GATEWAY_BIND_HOST: &str = "127.0.0.1";

pub fn status_tokens() -> Vec<String> {
    ["gateway", "status", "--json"].map(String::from).to_vec()
}

pub fn health_tokens() -> Vec<String> {
    vec!["status".to_string()]
}

pub fn doctor_tokens() -> Vec<String> {
    vec!["doctor".to_string()]
}

pub fn restart_tokens() -> Vec<String> {
    ["gateway", "restart"].map(String::from).to_vec()
}

/// Gateway state as reported by `gateway status --json`. Older CLIs print
/// plain text, in which case only `running` is inferred.
pub fn interpret_status(result: &CliResult) -> Value {
    if !result.success() {
        let stderr = result.stderr.trim();
        let error = if stderr.is_empty() {
            "Gateway not running"
        } else {
            stderr
        };
        return json!({
            "running": false,
            "rpcProbe": "fail",
            "port": GATEWAY_PORT,
            "bindHost": GATEWAY_BIND_HOST,
            "error": error,
        });
    }

    match as_json::<Value>(result).data {
        Some(Payload::Parsed(value)) => value,
        _ => {
            let running = result.stdout.to_lowercase().contains("running");
            json!({
                "running": running,
                "rpcProbe": if running { "ok" } else { "unknown" },
                "port": GATEWAY_PORT,
                "bindHost": GATEWAY_BIND_HOST,
                "raw": result.stdout,
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoctorReport {
    pub passed: bool,
    pub raw: String,
}

impl DoctorReport {
    pub fn from_result(result: &CliResult) -> Self {
        Self {
            passed: result.success(),
            raw: result.combined_output(),
        }
    }
}

/// Method names are dotted identifiers such as `config.get`.
pub fn validate_method(method: &str) -> Result<String, ValidationError> {
    let method = require_word("method", method)?;
    if !method
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(ValidationError::new(format!("invalid gateway method: {method}")));
    }
    Ok(method)
}
