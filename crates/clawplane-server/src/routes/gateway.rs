use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use clawplane_core::gateway::{self, DoctorReport};
use clawplane_core::channels;
use clawplane_runtime::{Payload, RunOptions};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::envelope::{failure_text, ApiError, ApiJson, Envelope};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(status))
        .route("/health", get(health))
        .route("/doctor", get(doctor))
        .route("/restart", post(restart))
        .route("/channels-status", get(channels_status))
        .route("/call", post(call))
}

async fn status(State(state): State<AppState>) -> Envelope {
    let result = state
        .runner
        .run_with(&gateway::status_tokens(), RunOptions::attempts(2))
        .await;
    Envelope::ok(gateway::interpret_status(&result))
}

async fn health(State(state): State<AppState>) -> Envelope {
    let result = state.runner.run(&gateway::health_tokens()).await;
    Envelope::ok(json!({
        "raw": result.stdout,
        "exitCode": result.exit_code,
    }))
}

async fn doctor(State(state): State<AppState>) -> Envelope {
    let result = state.runner.run(&gateway::doctor_tokens()).await;
    Envelope::ok(DoctorReport::from_result(&result))
}

async fn restart(State(state): State<AppState>) -> Envelope {
    let result = state.runner.run(&gateway::restart_tokens()).await;
    if result.success() {
        tracing::info!("gateway restarted in {}ms", result.duration_ms);
        Envelope::ok(json!({ "raw": result.stdout }))
    } else {
        tracing::warn!("gateway restart failed: {}", failure_text(&result));
        Envelope::failed(failure_text(&result)).with_data(json!({ "raw": result.stdout }))
    }
}

async fn channels_status(State(state): State<AppState>) -> Envelope {
    let result = state.runner.run(&channels::status_tokens()).await;
    Envelope::ok(json!({
        "raw": result.stdout,
        "exitCode": result.exit_code,
    }))
}

#[derive(Deserialize)]
struct CallRequest {
    #[serde(default)]
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

/// Escape hatch onto the gateway's RPC surface.
async fn call(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CallRequest>,
) -> Result<Envelope, ApiError> {
    let method = gateway::validate_method(&request.method)?;
    let params = request
        .params
        .unwrap_or_else(|| Value::Object(Map::new()));

    let reply = state.runner.gateway_call::<Value>(&method, &params).await;
    Ok(match reply.into_result() {
        Ok(Some(Payload::Parsed(value))) => Envelope::ok(value),
        Ok(Some(Payload::Raw(raw))) => Envelope::ok(json!({ "raw": raw })),
        Ok(None) => Envelope::ok(Value::Null),
        Err(error) => Envelope::failed(error),
    })
}

#[cfg(all(test, unix))]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::test_support::{send, test_app};

    #[tokio::test]
    async fn status_passes_json_through() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(test_app(dir.path()), "GET", "/api/gateway/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!({ "running": true, "port": 18789 }));
    }

    #[tokio::test]
    async fn doctor_and_health_report_raw_output() {
        let dir = tempfile::tempdir().unwrap();
        let (_, body) = send(test_app(dir.path()), "GET", "/api/gateway/doctor", None).await;
        assert_eq!(body["data"]["passed"], true);
        assert_eq!(body["data"]["raw"], "all checks passed\n");

        let (_, body) = send(test_app(dir.path()), "GET", "/api/gateway/health", None).await;
        assert_eq!(body["data"]["exitCode"], 0);
        assert_eq!(body["data"]["raw"], "OpenClaw: running\n");
    }

    #[tokio::test]
    async fn restart_returns_cli_output() {
        let dir = tempfile::tempdir().unwrap();
        let (_, body) = send(test_app(dir.path()), "POST", "/api/gateway/restart", None).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["data"]["raw"], "Gateway restarted\n");
    }

    #[tokio::test]
    async fn call_forwards_method_and_params() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(
            test_app(dir.path()),
            "POST",
            "/api/gateway/call",
            Some(json!({ "method": "config.get", "params": { "key": "it's" } })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["data"],
            json!({ "method": "config.get", "params": { "key": "it's" } })
        );
    }

    #[tokio::test]
    async fn call_rejects_bad_method() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(
            test_app(dir.path()),
            "POST",
            "/api/gateway/call",
            Some(json!({ "method": "--help" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
    }
}
