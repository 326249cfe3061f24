use axum::extract::State;
use axum::Json;
use clawplane_core::settings::SERVICE_NAME;
use serde_json::{json, Value};

use crate::state::AppState;

/// Liveness of the adapter itself. Never runs the CLI.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let target = state.runner.target();
    Json(json!({
        "ok": true,
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "time": chrono::Utc::now().to_rfc3339(),
        "wsl": {
            "enabled": target.uses_indirection,
            "distro": target.distro,
        },
    }))
}
