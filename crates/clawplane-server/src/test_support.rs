//! A scripted `openclaw` binary and helpers to drive the router with it.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use clawplane_core::{AdapterSettings, OpenClawPaths};
use clawplane_runtime::RetryPolicy;
use serde_json::Value;
use tower::util::ServiceExt;

use crate::state::AppState;

const FAKE_CLI: &str = r#"#!/bin/sh
case "$1 $2" in
  "gateway status") echo '{"running":true,"port":18789}' ;;
  "gateway restart") echo "Gateway restarted" ;;
  "gateway call") printf '{"method":"%s","params":%s}\n' "$3" "$5" ;;
  "cron list") echo '{"jobs":[{"id":"j1","name":"daily"}]}' ;;
  "cron add"|"cron run"|"cron remove"|"cron runs"|"clawhub install"|"skills info") printf '%s\n' "$@" ;;
  "skills list") echo '[{"name":"weather"}]' ;;
  "skills check") echo "2 ready"; echo "1 missing binary" >&2 ;;
  "sessions list") echo "gateway unreachable" >&2; exit 1 ;;
  "logs --lines") echo '{"level":"warn","message":"disk"}'; echo "plain line" ;;
  "logs --follow") echo "first"; echo "oops" >&2; echo "second" ;;
  "channels status") echo "telegram: ok" ;;
  "doctor ") echo "all checks passed" ;;
  "status ") echo "OpenClaw: running" ;;
  *) echo "unknown command: $*" >&2; exit 2 ;;
esac
"#;

/// Written once per test binary, before any test can spawn it.
pub fn fake_cli() -> &'static Path {
    static CLI: OnceLock<PathBuf> = OnceLock::new();
    CLI.get_or_init(|| {
        use std::os::unix::fs::PermissionsExt;

        let dir = std::env::temp_dir().join(format!("clawplane-fake-cli-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("create fake cli dir");
        let path = dir.join("openclaw");
        std::fs::write(&path, FAKE_CLI).expect("write fake cli");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod fake cli");
        path
    })
}

pub fn test_state(state_dir: &Path) -> AppState {
    test_state_with(state_dir, |_| {})
}

pub fn test_state_with(state_dir: &Path, tweak: impl FnOnce(&mut AdapterSettings)) -> AppState {
    let mut settings = AdapterSettings {
        openclaw_bin: fake_cli().display().to_string(),
        use_wsl: Some("false".into()),
        state_dir: Some(state_dir.to_path_buf()),
        ..AdapterSettings::default()
    };
    tweak(&mut settings);
    let runner = settings.runner().with_policy(RetryPolicy {
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(20),
        ..RetryPolicy::default()
    });
    AppState::new(settings, runner, OpenClawPaths::under(state_dir))
}

pub fn test_app(state_dir: &Path) -> Router {
    crate::create_router(test_state(state_dir))
}

pub async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .expect("build request");

    let response = app.oneshot(request).await.expect("send request");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, json)
}
