use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Router,
};
use clawplane_core::cron::{self, CronAddRequest, CronRunRequest};
use clawplane_runtime::RunOptions;
use serde::Deserialize;

use crate::envelope::{ApiError, ApiJson, Envelope};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/list", get(list_jobs))
        .route("/add", post(add_job))
        .route("/run", post(run_job))
        .route("/runs", get(list_runs))
        .route("/{job_id}", delete(remove_job))
}

async fn list_jobs(State(state): State<AppState>) -> Envelope {
    let result = state
        .runner
        .run_with(&cron::list_tokens(), RunOptions::attempts(2))
        .await;
    Envelope::from_json_output(&result)
}

async fn add_job(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CronAddRequest>,
) -> Result<Envelope, ApiError> {
    let tokens = request.to_tokens()?;
    let result = state.runner.run(&tokens).await;
    if result.success() {
        tracing::info!("added cron job {:?}", request.name);
    }
    Ok(Envelope::from_raw_output(&result))
}

async fn run_job(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CronRunRequest>,
) -> Result<Envelope, ApiError> {
    let tokens = request.to_tokens()?;
    let result = state.runner.run(&tokens).await;
    Ok(Envelope::from_raw_output(&result))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunsQuery {
    job_id: Option<String>,
    limit: Option<u32>,
}

async fn list_runs(
    State(state): State<AppState>,
    Query(query): Query<RunsQuery>,
) -> Result<Envelope, ApiError> {
    let tokens = cron::runs_tokens(query.job_id.as_deref(), query.limit)?;
    let result = state.runner.run(&tokens).await;
    Ok(Envelope::from_json_output(&result))
}

async fn remove_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Envelope, ApiError> {
    let tokens = cron::remove_tokens(&job_id)?;
    let result = state.runner.run(&tokens).await;
    if result.success() {
        tracing::info!("removed cron job {job_id}");
    }
    Ok(Envelope::from_raw_output(&result))
}
