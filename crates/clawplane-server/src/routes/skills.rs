use axum::{
    extract::{Path, State},
    routing::{get, post},
    Router,
};
use clawplane_core::skills::{self, SkillCreateRequest};
use clawplane_core::validate::require_word;
use clawplane_runtime::RunOptions;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::envelope::{ApiError, ApiJson, Envelope};
use crate::state::AppState;

const CONFIG_WARNINGS: &[&str] = &["Skill config changes take effect on the next agent session."];
const CREATE_WARNINGS: &[&str] =
    &["Restart the Gateway or start a new session for the skill to load."];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/list", get(list_skills))
        .route("/check", get(check_skills))
        .route("/info/{name}", get(skill_info))
        .route("/install", post(install_skill))
        .route("/update-all", post(update_all))
        .route("/sync", post(sync_skills))
        .route("/create", post(create_skill))
        .route("/config", get(get_config).put(update_config))
        .route("/locations", get(locations))
}

async fn list_skills(State(state): State<AppState>) -> Envelope {
    let result = state
        .runner
        .run_with(&skills::list_tokens(), RunOptions::attempts(2))
        .await;
    Envelope::from_json_output(&result)
}

async fn check_skills(State(state): State<AppState>) -> Envelope {
    let result = state.runner.run(&skills::check_tokens()).await;
    let data = json!({ "raw": result.combined_output() });
    if result.success() {
        Envelope::ok(data)
    } else {
        Envelope::failed(crate::envelope::failure_text(&result)).with_data(data)
    }
}

async fn skill_info(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Envelope, ApiError> {
    let tokens = skills::info_tokens(&name)?;
    let result = state.runner.run(&tokens).await;
    Ok(Envelope::from_raw_output(&result))
}

#[derive(Deserialize)]
struct InstallRequest {
    #[serde(default)]
    slug: String,
}

async fn install_skill(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<InstallRequest>,
) -> Result<Envelope, ApiError> {
    let tokens = skills::install_tokens(&request.slug)?;
    let result = state.runner.run(&tokens).await;
    if result.success() {
        tracing::info!("installed skill {}", request.slug.trim());
    }
    Ok(Envelope::from_raw_output(&result))
}

async fn update_all(State(state): State<AppState>) -> Envelope {
    let result = state.runner.run(&skills::update_all_tokens()).await;
    Envelope::from_raw_output(&result)
}

async fn sync_skills(State(state): State<AppState>) -> Envelope {
    let result = state.runner.run(&skills::sync_tokens()).await;
    Envelope::from_raw_output(&result)
}

async fn create_skill(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SkillCreateRequest>,
) -> Result<Envelope, ApiError> {
    let filename = request.target_filename()?;
    let created = skills::write_skill(&state.paths.skills_dir(), &filename, &request).await?;
    Ok(Envelope::ok(created).with_warnings(CREATE_WARNINGS))
}

async fn get_config(State(state): State<AppState>) -> Result<Envelope, ApiError> {
    let snapshot = state.config.read().await?;
    Ok(Envelope::ok(skills::skills_section(&snapshot.parsed)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SkillConfigUpdate {
    #[serde(default)]
    skill_key: String,
    #[serde(default)]
    entry: Option<Map<String, Value>>,
}

async fn update_config(
    State(state): State<AppState>,
    ApiJson(update): ApiJson<SkillConfigUpdate>,
) -> Result<Envelope, ApiError> {
    let key = require_word("skillKey", &update.skill_key)?;
    let entry = update
        .entry
        .ok_or_else(|| ApiError::bad_request("entry object is required"))?;

    let (merged, hash) = state
        .config
        .update(|root| skills::merge_skill_entry(root, &key, &entry))
        .await?;
    tracing::info!("updated skill config for {key}");

    Ok(Envelope::ok(json!({ "skillKey": key, "entry": merged, "hash": hash }))
        .with_warnings(CONFIG_WARNINGS))
}

async fn locations(State(state): State<AppState>) -> Result<Envelope, ApiError> {
    let snapshot = state.config.read().await?;
    Ok(Envelope::ok(skills::skill_locations(
        &snapshot.parsed,
        &state.paths.skills_dir(),
    )))
}
