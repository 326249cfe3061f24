//! Where OpenClaw keeps its state, seen from the adapter's side.

use std::path::PathBuf;
use std::time::Duration;

use clawplane_runtime::{BuiltCommand, CliRunner, RetryPolicy, RunOptions, SpawnSpec};
use serde::Serialize;

use crate::settings::AdapterSettings;

const STATE_DIR_NAME: &str = ".openclaw";
const CONFIG_FILE_NAME: &str = "openclaw.json";
const FALLBACK_DISTRO: &str = "Ubuntu";
const FALLBACK_WSL_HOME: &str = r"\\wsl$\Ubuntu\home\user";
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenClawPaths {
    pub state_dir: PathBuf,
    pub config_path: PathBuf,
}

impl OpenClawPaths {
    /// Paths rooted at one state directory.
    pub fn under(state_dir: impl Into<PathBuf>) -> Self {
        let state_dir = state_dir.into();
        Self {
            config_path: state_dir.join(CONFIG_FILE_NAME),
            state_dir,
        }
    }

    pub fn skills_dir(&self) -> PathBuf {
        self.state_dir.join("skills")
    }

    /// Explicit overrides win; otherwise the state lives in the home
    /// directory of whichever environment runs the CLI.
    pub async fn resolve(settings: &AdapterSettings, runner: &CliRunner) -> Self {
        let state_dir = match &settings.state_dir {
            Some(dir) => dir.clone(),
            None => default_state_dir(runner).await,
        };

        let mut paths = Self::under(state_dir);
        if let Some(config_path) = &settings.config_path {
            paths.config_path = config_path.clone();
        }
        paths
    }
}

async fn default_state_dir(runner: &CliRunner) -> PathBuf {
    if runner.target().uses_indirection {
        return detect_wsl_home(runner).await.join(STATE_DIR_NAME);
    }
    local_home().join(STATE_DIR_NAME)
}

fn local_home() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// The WSL user's home as a `\\wsl$\<distro>\...` path reachable from
/// Windows. Falls back to the stock Ubuntu home when WSL does not answer.
pub async fn detect_wsl_home(runner: &CliRunner) -> PathBuf {
    let home = runner
        .run_script("echo $HOME", RunOptions::timeout(PROBE_TIMEOUT))
        .await;
    let home_dir = home.stdout.trim();
    if !home.success() || home_dir.is_empty() {
        tracing::warn!("could not detect WSL home, falling back to {FALLBACK_WSL_HOME}");
        return PathBuf::from(FALLBACK_WSL_HOME);
    }

    let list = BuiltCommand::Spawn(SpawnSpec {
        program: "wsl".to_string(),
        args: vec!["-l".to_string(), "-q".to_string()],
    });
    let policy = RetryPolicy {
        timeout: PROBE_TIMEOUT,
        ..RetryPolicy::default()
    };
    let listing = runner.run_built("wsl -l", &list, &policy).await;
    let listed = if listing.success() {
        listing.stdout.as_str()
    } else {
        ""
    };

    let distro = pick_distro(listed, runner.target().distro.as_deref());
    let unc = unc_home(&distro, home_dir);
    tracing::info!("WSL home detected: {}", unc.display());
    unc
}

/// `wsl -l -q` prints UTF-16, which arrives here with NULs between the
/// characters. The configured distro is matched case-insensitively; without
/// one the first (default) entry wins.
pub fn pick_distro(listing: &str, configured: Option<&str>) -> String {
    let cleaned = listing.replace('\0', "");
    let names: Vec<&str> = cleaned
        .lines()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .collect();

    match configured {
        Some(wanted) => names
            .iter()
            .find(|n| n.eq_ignore_ascii_case(wanted))
            .map(|n| n.to_string())
            .unwrap_or_else(|| wanted.to_string()),
        None => names
            .first()
            .map(|n| n.to_string())
            .unwrap_or_else(|| FALLBACK_DISTRO.to_string()),
    }
}

pub fn unc_home(distro: &str, home: &str) -> PathBuf {
    PathBuf::from(format!(r"\\wsl$\{distro}{}", home.replace('/', r"\")))
}
