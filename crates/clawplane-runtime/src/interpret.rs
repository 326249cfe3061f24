//! Decoding captured stdout into typed payloads.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::runner::CliResult;

const GENERIC_FAILURE: &str = "Command failed";

/// Either decoded data or the error text of a failed command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonReply<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> JsonReply<T> {
    pub fn data(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<Option<T>, String> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.data),
        }
    }
}

/// stdout that decoded as `T`, or the raw text when it did not.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload<T> {
    Parsed(T),
    Raw(String),
}

impl<T> Payload<T> {
    pub fn parsed(self) -> Option<T> {
        match self {
            Self::Parsed(value) => Some(value),
            Self::Raw(_) => None,
        }
    }
}

impl Payload<Value> {
    /// Collapses both cases into one JSON value.
    pub fn into_value(self) -> Value {
        match self {
            Self::Parsed(value) => value,
            Self::Raw(text) => Value::String(text),
        }
    }
}

pub fn as_json<T: DeserializeOwned>(result: &CliResult) -> JsonReply<Payload<T>> {
    if !result.success() {
        let error = result.error_text().unwrap_or(GENERIC_FAILURE);
        return JsonReply::error(error.trim());
    }

    match serde_json::from_str::<T>(&result.stdout) {
        Ok(value) => JsonReply::data(Payload::Parsed(value)),
        Err(e) => {
            tracing::debug!("stdout is not JSON ({e}), returning raw text");
            JsonReply::data(Payload::Raw(result.stdout.clone()))
        }
    }
}

/// One JSON value per non-empty line. Lines that do not parse become plain
/// `info` entries stamped with the current time.
pub fn parse_json_lines(stdout: &str) -> Vec<Value> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            serde_json::from_str(line).unwrap_or_else(|_| {
                json!({
                    "message": line,
                    "level": "info",
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                })
            })
        })
        .collect()
}
