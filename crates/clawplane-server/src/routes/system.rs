use axum::{extract::State, routing::get, Router};
use clawplane_core::settings::SERVICE_NAME;
use serde_json::json;

use crate::envelope::Envelope;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/version", get(version))
        .route("/metrics", get(metrics))
        .route("/health", get(health))
}

async fn version(State(state): State<AppState>) -> Envelope {
    Envelope::ok(json!({
        "name": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "openclawBin": state.runner.builder().program(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

fn format_uptime(secs: u64) -> String {
    let (days, rest) = (secs / 86_400, secs % 86_400);
    let (hours, rest) = (rest / 3_600, rest % 3_600);
    let (minutes, seconds) = (rest / 60, rest % 60);
    if days > 0 {
        format!("{days}d {hours}h {minutes}m {seconds}s")
    } else if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else {
        format!("{minutes}m {seconds}s")
    }
}

async fn metrics(State(state): State<AppState>) -> Envelope {
    let uptime = state.started_at.elapsed().as_secs();
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    Envelope::ok(json!({
        "uptime": {
            "seconds": uptime,
            "formatted": format_uptime(uptime),
        },
        "system": {
            "platform": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
            "cpus": cpus,
        },
        "rateLimit": {
            "requestsPerMinute": state.rate_limiter.config().requests_per_minute,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn health(State(state): State<AppState>) -> Envelope {
    let target = state.runner.target();
    Envelope::ok(json!({
        "status": "healthy",
        "checks": {
            "process": { "healthy": true, "uptimeSeconds": state.started_at.elapsed().as_secs() },
            "target": {
                "healthy": true,
                "wsl": target.uses_indirection,
                "distro": target.distro,
            },
            "config": {
                "path": state.paths.config_path.display().to_string(),
                "exists": state.paths.config_path.exists(),
            },
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
