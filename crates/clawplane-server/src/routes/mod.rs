pub mod channels;
pub mod config;
pub mod cron;
pub mod gateway;
pub mod health;
pub mod logs;
pub mod sessions;
pub mod skills;
pub mod system;

use axum::Router;

use crate::state::AppState;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/gateway", gateway::router())
        .nest("/cron", cron::router())
        .nest("/skills", skills::router())
        .nest("/channels", channels::router())
        .nest("/config", config::router())
        .nest("/logs", logs::router())
        .nest("/sessions", sessions::router())
        .nest("/system", system::router())
}
