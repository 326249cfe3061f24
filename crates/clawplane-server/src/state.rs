use std::sync::Arc;
use std::time::Instant;

use clawplane_core::{AdapterSettings, ConfigStore, OpenClawPaths};
use clawplane_runtime::CliRunner;

use crate::rate_limit::{RateLimitConfig, RateLimiter};

/// Shared application state accessible from all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<AdapterSettings>,
    /// Runs every `openclaw` invocation, locally or through WSL.
    pub runner: CliRunner,
    pub paths: Arc<OpenClawPaths>,
    /// `openclaw.json`, serialized writes.
    pub config: ConfigStore,
    pub rate_limiter: Arc<RateLimiter>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(settings: AdapterSettings, runner: CliRunner, paths: OpenClawPaths) -> Self {
        let rate_limiter = RateLimiter::new(RateLimitConfig {
            requests_per_minute: settings.rate_limit,
            burst: settings.rate_limit,
        });
        Self {
            config: ConfigStore::new(paths.config_path.clone()),
            settings: Arc::new(settings),
            runner,
            paths: Arc::new(paths),
            rate_limiter: Arc::new(rate_limiter),
            started_at: Instant::now(),
        }
    }
}
