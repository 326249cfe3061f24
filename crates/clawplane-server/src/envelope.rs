//! The `{ ok, data, error, warnings }` shape every endpoint answers with.

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use clawplane_core::{StoreError, ValidationError};
use clawplane_runtime::{as_json, CliResult, Payload};
use serde::Serialize;
use serde_json::{json, Value};

const GENERIC_FAILURE: &str = "Command failed";

/// Error detail. Route handlers report a plain message; the middleware
/// layers report a machine readable code as well.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ErrorBody {
    Message(String),
    Detail {
        code: &'static str,
        message: String,
        timestamp: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Envelope {
    pub fn ok(data: impl Serialize) -> Self {
        let data = serde_json::to_value(data).unwrap_or_else(|e| {
            tracing::error!("failed to serialize response data: {e}");
            Value::Null
        });
        Self {
            ok: true,
            data: Some(data),
            error: None,
            warnings: Vec::new(),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(ErrorBody::Message(error.into())),
            warnings: Vec::new(),
        }
    }

    pub fn coded(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(ErrorBody::Detail {
                code,
                message: message.into(),
                timestamp: chrono::Utc::now().to_rfc3339(),
            }),
            warnings: Vec::new(),
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_warnings<S: AsRef<str>>(mut self, warnings: &[S]) -> Self {
        self.warnings
            .extend(warnings.iter().map(|w| w.as_ref().to_string()));
        self
    }

    /// Decoded stdout on success, `{ raw }` when it is not JSON, and the
    /// command's error text on failure.
    pub fn from_json_output(result: &CliResult) -> Self {
        let reply = as_json::<Value>(result);
        let envelope = match (reply.data, reply.error) {
            (_, Some(error)) => Self::failed(error),
            (Some(Payload::Parsed(value)), None) => Self::ok(value),
            (Some(Payload::Raw(raw)), None) => Self::ok(json!({ "raw": raw })),
            (None, None) => Self::ok(Value::Null),
        };
        envelope.with_retry_note(result)
    }

    /// `{ raw: stdout }`, with `ok` following the exit code.
    pub fn from_raw_output(result: &CliResult) -> Self {
        let envelope = if result.success() {
            Self::ok(json!({ "raw": result.stdout }))
        } else {
            Self::failed(failure_text(result)).with_data(json!({ "raw": result.stdout }))
        };
        envelope.with_retry_note(result)
    }

    fn with_retry_note(mut self, result: &CliResult) -> Self {
        if let (true, Some(attempts)) = (result.success(), result.retries) {
            self.warnings
                .push(format!("Succeeded after {attempts} attempts"));
        }
        self
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

pub fn failure_text(result: &CliResult) -> String {
    result
        .error_text()
        .map(|text| text.trim().to_string())
        .unwrap_or_else(|| GENERIC_FAILURE.to_string())
}

/// A failed request: an envelope plus the status it is sent with.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: Envelope,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: Envelope::failed(message),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn with_warnings<S: AsRef<str>>(mut self, warnings: &[S]) -> Self {
        self.body = self.body.with_warnings(warnings);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match &err {
            StoreError::Invalid { .. } => Self::bad_request(err.to_string()),
            StoreError::Conflict { .. } => Self::new(StatusCode::CONFLICT, err.to_string()),
            StoreError::Io { .. } | StoreError::Serialize(_) => {
                tracing::error!("config store failure: {err}");
                Self::internal(err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

/// `Json` whose rejections are reported as envelopes.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
