//! Direct access to `openclaw.json`.

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use clawplane_core::config_store::parse_json5;
use clawplane_core::StoreError;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::envelope::{ApiError, ApiJson, Envelope};
use crate::state::AppState;

const WRITE_WARNINGS: &[&str] = &[
    "Config saved. Some changes require a Gateway restart.",
    "A backup was written to openclaw.json.bak.",
];
const INVALID_WARNINGS: &[&str] = &["OpenClaw will refuse to start with an invalid config."];
const CONFLICT_WARNINGS: &[&str] = &["Someone else changed the config. Reload before saving."];
const VALID_WARNINGS: &[&str] = &["Syntax is valid. Field values are checked by OpenClaw on load."];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_config).put(replace_config))
        .route("/patch", post(patch_config))
        .route("/validate", post(validate_config))
}

async fn get_config(State(state): State<AppState>) -> Result<Envelope, ApiError> {
    let snapshot = state.config.read().await?;
    Ok(Envelope::ok(snapshot))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplaceRequest {
    #[serde(default)]
    raw: String,
    #[serde(default)]
    base_hash: Option<String>,
}

fn store_failure(err: StoreError) -> ApiError {
    let warnings: &[&str] = match &err {
        StoreError::Invalid { .. } => INVALID_WARNINGS,
        StoreError::Conflict { .. } => CONFLICT_WARNINGS,
        _ => &[],
    };
    ApiError::from(err).with_warnings(warnings)
}

async fn replace_config(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ReplaceRequest>,
) -> Result<Envelope, ApiError> {
    if request.raw.trim().is_empty() {
        return Err(ApiError::bad_request("raw config content is required"));
    }
    let hash = state
        .config
        .replace(&request.raw, request.base_hash.as_deref())
        .await
        .map_err(store_failure)?;
    tracing::info!("config replaced, hash {hash}");
    Ok(Envelope::ok(json!({ "hash": hash })).with_warnings(WRITE_WARNINGS))
}

#[derive(Deserialize)]
struct PatchRequest {
    #[serde(default)]
    patch: Value,
}

async fn patch_config(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<PatchRequest>,
) -> Result<Envelope, ApiError> {
    let Value::Object(patch) = &request.patch else {
        return Err(ApiError::bad_request("patch object is required"));
    };
    let hash = state.config.patch(patch).await.map_err(store_failure)?;
    tracing::info!("config patched, hash {hash}");
    Ok(Envelope::ok(json!({ "hash": hash, "applied": request.patch })).with_warnings(WRITE_WARNINGS))
}

#[derive(Deserialize)]
struct ValidateRequest {
    #[serde(default)]
    raw: String,
}

/// Syntax check only; a syntax error is a normal answer, not a failed request.
async fn validate_config(ApiJson(request): ApiJson<ValidateRequest>) -> Result<Envelope, ApiError> {
    match parse_json5(&request.raw) {
        Ok(_) => Ok(Envelope::ok(json!({ "valid": true })).with_warnings(VALID_WARNINGS)),
        Err(StoreError::Invalid { message, location }) => Ok(Envelope::ok(json!({
            "valid": false,
            "error": message,
            "line": location.map(|l| l.line),
            "column": location.map(|l| l.column),
        }))),
        Err(err) => Err(ApiError::from(err)),
    }
}
