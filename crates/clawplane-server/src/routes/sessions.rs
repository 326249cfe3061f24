use axum::{extract::State, routing::get, Router};
use clawplane_core::sessions::{self, SOURCE_OF_TRUTH_WARNINGS};
use clawplane_runtime::RunOptions;

use crate::envelope::Envelope;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_sessions))
}

async fn list_sessions(State(state): State<AppState>) -> Envelope {
    let result = state
        .runner
        .run_with(&sessions::list_tokens(), RunOptions::attempts(2))
        .await;
    let envelope = Envelope::from_json_output(&result);
    if envelope.ok {
        envelope
    } else {
        envelope.with_warnings(SOURCE_OF_TRUTH_WARNINGS)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use axum::http::StatusCode;

    use crate::test_support::{send, test_app};

    #[tokio::test]
    async fn failure_is_reported_with_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(test_app(dir.path()), "GET", "/api/sessions", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"], "gateway unreachable");
        assert_eq!(body["warnings"].as_array().unwrap().len(), 2);
    }
}
