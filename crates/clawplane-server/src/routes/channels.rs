use axum::{
    extract::{Path, State},
    routing::{get, put},
    Router,
};
use clawplane_core::channels::{self, RESTART_WARNINGS};
use serde_json::{json, Map, Value};

use crate::envelope::{ApiError, ApiJson, Envelope};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_channels))
        .route("/list", get(list_channels))
        .route("/status", get(channels_status))
        .route("/{provider}", put(update_channel))
}

async fn list_channels(State(state): State<AppState>) -> Result<Envelope, ApiError> {
    let snapshot = state.config.read().await?;
    Ok(Envelope::ok(channels::summarize(&snapshot.parsed)))
}

async fn channels_status(State(state): State<AppState>) -> Envelope {
    let result = state.runner.run(&channels::status_tokens()).await;
    Envelope::ok(json!({
        "raw": result.stdout,
        "exitCode": result.exit_code,
    }))
}

async fn update_channel(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    ApiJson(update): ApiJson<Map<String, Value>>,
) -> Result<Envelope, ApiError> {
    let provider = channels::validate_provider(&provider)?;
    let (merged, hash) = state
        .config
        .update(|root| channels::merge_channel(root, provider, &update))
        .await?;
    tracing::info!("updated channel config for {provider}");

    Ok(
        Envelope::ok(json!({ "provider": provider, "config": merged, "hash": hash }))
            .with_warnings(RESTART_WARNINGS),
    )
}
