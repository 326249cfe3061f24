//! Adapter settings, assembled by the binary from flags and environment.

use std::path::PathBuf;

use clawplane_runtime::{CliRunner, CommandBuilder, ExecutionTarget, HostOs};
use serde::{Deserialize, Serialize};

pub const SERVICE_NAME: &str = "openclaw-control-plane-adapter";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_GATEWAY_URL: &str = "ws://127.0.0.1:18789";
pub const DEFAULT_RATE_LIMIT: u32 = 100;
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:3004",
    "http://127.0.0.1:3004",
    "http://localhost:3000",
    "http://127.0.0.1:3000",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdapterSettings {
    pub host: String,
    pub port: u16,
    pub gateway_url: String,
    pub openclaw_bin: String,
    /// Raw `OPENCLAW_USE_WSL` value; `None` lets the host OS decide.
    pub use_wsl: Option<String>,
    pub wsl_distro: Option<String>,
    pub config_path: Option<PathBuf>,
    pub state_dir: Option<PathBuf>,
    pub allowed_origins: Vec<String>,
    /// Requests per client per minute.
    pub rate_limit: u32,
    pub body_limit: usize,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            openclaw_bin: clawplane_runtime::DEFAULT_PROGRAM.to_string(),
            use_wsl: None,
            wsl_distro: None,
            config_path: None,
            state_dir: None,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(|o| o.to_string())
                .collect(),
            rate_limit: DEFAULT_RATE_LIMIT,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl AdapterSettings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn target(&self) -> ExecutionTarget {
        ExecutionTarget::resolve(
            self.use_wsl.as_deref(),
            self.wsl_distro.as_deref(),
            HostOs::current(),
        )
    }

    pub fn runner(&self) -> CliRunner {
        CliRunner::new(CommandBuilder::with_program(
            self.openclaw_bin.clone(),
            self.target(),
        ))
    }
}

/// Splits a comma separated origin list, dropping blanks.
pub fn parse_origins(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}
