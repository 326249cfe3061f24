use std::convert::Infallible;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use clawplane_core::logs;
use clawplane_runtime::{parse_json_lines, StreamEvent};
use futures_core::Stream;
use serde::Deserialize;
use tokio_stream::StreamExt;

use crate::envelope::{failure_text, ApiError, Envelope};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(recent_logs))
        .route("/stream", get(stream_logs))
}

#[derive(Deserialize)]
struct LogsQuery {
    lines: Option<u32>,
}

async fn recent_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Envelope {
    let result = state.runner.run(&logs::recent_tokens(query.lines)).await;
    if !result.success() && result.stdout.trim().is_empty() {
        return Envelope::failed(failure_text(&result));
    }
    Envelope::ok(parse_json_lines(&result.stdout))
}

/// Follows `openclaw logs`. Closing the connection drops the stream, which
/// kills the child process.
async fn stream_logs(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let mut output = state
        .runner
        .stream(&logs::follow_tokens())
        .map_err(|e| ApiError::internal(e.to_string()))?;
    tracing::info!("log stream opened");

    let stream = async_stream::stream! {
        while let Some(event) = output.next().await {
            match event {
                StreamEvent::Stdout(line) => {
                    if !line.trim().is_empty() {
                        yield Ok(Event::default().data(line));
                    }
                }
                StreamEvent::Stderr(line) => {
                    if !line.trim().is_empty() {
                        yield Ok(Event::default().data(logs::stderr_entry(&line)));
                    }
                }
                StreamEvent::Exit { code } => {
                    tracing::info!("log stream ended with {code:?}");
                    yield Ok(Event::default().event("close").data("done"));
                    break;
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
