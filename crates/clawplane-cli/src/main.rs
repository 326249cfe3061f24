use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clawplane_core::settings::{self, parse_origins, AdapterSettings};
use clawplane_core::OpenClawPaths;
use clawplane_server::state::AppState;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(
    name = "clawplane",
    version,
    about = "HTTP control plane for a local OpenClaw install"
)]
struct Cli {
    #[arg(long, env = "ADAPTER_HOST", default_value = settings::DEFAULT_HOST, global = true)]
    host: String,

    #[arg(long, env = "ADAPTER_PORT", default_value_t = settings::DEFAULT_PORT, global = true)]
    port: u16,

    #[arg(long, env = "GATEWAY_URL", default_value = settings::DEFAULT_GATEWAY_URL, global = true)]
    gateway_url: String,

    #[arg(
        long,
        env = "OPENCLAW_BIN",
        default_value = clawplane_runtime::DEFAULT_PROGRAM,
        global = true,
        help = "openclaw executable name or path"
    )]
    openclaw_bin: String,

    #[arg(
        long,
        env = "OPENCLAW_USE_WSL",
        global = true,
        help = "Run the CLI through WSL (true/false); defaults to the host OS"
    )]
    use_wsl: Option<String>,

    #[arg(long, env = "OPENCLAW_WSL_DISTRO", global = true)]
    wsl_distro: Option<String>,

    #[arg(long, env = "OPENCLAW_CONFIG_PATH", global = true)]
    config_path: Option<PathBuf>,

    #[arg(long, env = "OPENCLAW_STATE_DIR", global = true)]
    state_dir: Option<PathBuf>,

    #[arg(
        long,
        env = "ADAPTER_ALLOWED_ORIGINS",
        global = true,
        help = "Comma separated CORS origins"
    )]
    allowed_origins: Option<String>,

    #[arg(
        long,
        env = "ADAPTER_RATE_LIMIT",
        default_value_t = settings::DEFAULT_RATE_LIMIT,
        global = true,
        help = "Requests per client per minute, 0 disables"
    )]
    rate_limit: u32,

    #[arg(long, env = "ADAPTER_LOG_DIR", global = true, help = "Also write daily log files here")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Start the HTTP adapter (default)")]
    Serve,
    #[command(about = "Run one openclaw command the way the adapter would and print the result")]
    Exec {
        #[arg(long, help = "Attempts before giving up")]
        attempts: Option<u32>,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        args: Vec<String>,
    },
    #[command(about = "Show the resolved execution target and OpenClaw paths")]
    Paths,
}

impl Cli {
    fn settings(&self) -> AdapterSettings {
        let defaults = AdapterSettings::default();
        AdapterSettings {
            host: self.host.clone(),
            port: self.port,
            gateway_url: self.gateway_url.clone(),
            openclaw_bin: self.openclaw_bin.clone(),
            use_wsl: self.use_wsl.clone(),
            wsl_distro: self.wsl_distro.clone(),
            config_path: self.config_path.clone(),
            state_dir: self.state_dir.clone(),
            allowed_origins: self
                .allowed_origins
                .as_deref()
                .map(parse_origins)
                .unwrap_or(defaults.allowed_origins),
            rate_limit: self.rate_limit,
            body_limit: defaults.body_limit,
        }
    }
}

fn init_logging(
    log_dir: Option<&PathBuf>,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log dir {}", dir.display()))?;
            let file_appender = tracing_appender::rolling::daily(dir, "clawplane.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(guard)
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => tracing::info!("Received SIGINT, shutting down..."),
                    _ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                tracing::warn!("failed to install SIGTERM handler: {e}");
                ctrl_c.await.ok();
                tracing::info!("Received SIGINT, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        tracing::info!("Received SIGINT, shutting down...");
    }
}

async fn serve(settings: AdapterSettings) -> Result<()> {
    let runner = settings.runner();
    let target = runner.target().clone();
    let paths = OpenClawPaths::resolve(&settings, &runner).await;
    tracing::info!(
        "running openclaw {} (wsl: {}, distro: {:?})",
        settings.openclaw_bin,
        target.uses_indirection,
        target.distro
    );
    tracing::info!("openclaw config at {}", paths.config_path.display());
    tracing::info!("openclaw gateway at {}", settings.gateway_url);

    let addr = settings.bind_addr();
    let state = AppState::new(settings, runner, paths);
    clawplane_server::serve(state, &addr, shutdown_signal())
        .await
        .with_context(|| format!("adapter server on {addr} failed"))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.log_dir.as_ref())?;
    let settings = cli.settings();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            serve(settings).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Exec { attempts, args } => {
            let runner = settings.runner();
            let options = clawplane_runtime::RunOptions {
                attempts,
                ..Default::default()
            };
            let result = runner.run_with(&args, options).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(if result.success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(u8::try_from(result.exit_code).unwrap_or(1))
            })
        }
        Commands::Paths => {
            let runner = settings.runner();
            let paths = OpenClawPaths::resolve(&settings, &runner).await;
            let target = runner.target();
            let report = serde_json::json!({
                "program": runner.builder().program(),
                "wsl": target.uses_indirection,
                "distro": target.distro,
                "gatewayUrl": settings.gateway_url,
                "stateDir": paths.state_dir,
                "configPath": paths.config_path,
                "skillsDir": paths.skills_dir(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_become_settings() {
        let cli = Cli::try_parse_from([
            "clawplane",
            "--port",
            "4000",
            "--use-wsl",
            "true",
            "--wsl-distro",
            "Debian",
            "--allowed-origins",
            "http://a:1, http://b:2",
            "serve",
        ])
        .unwrap();
        let settings = cli.settings();
        assert_eq!(settings.port, 4000);
        assert_eq!(settings.use_wsl.as_deref(), Some("true"));
        assert_eq!(settings.allowed_origins, vec!["http://a:1", "http://b:2"]);
        assert!(settings.target().uses_indirection);
    }

    #[test]
    fn gateway_url_flag_reaches_settings() {
        let cli =
            Cli::try_parse_from(["clawplane", "--gateway-url", "ws://10.0.0.5:18789", "paths"])
                .unwrap();
        assert_eq!(cli.settings().gateway_url, "ws://10.0.0.5:18789");
    }

    #[test]
    fn exec_keeps_flag_like_arguments() {
        let cli = Cli::try_parse_from(["clawplane", "exec", "gateway", "status", "--json"]).unwrap();
        match cli.command {
            Some(Commands::Exec { args, attempts }) => {
                assert_eq!(args, vec!["gateway", "status", "--json"]);
                assert_eq!(attempts, None);
            }
            _ => panic!("expected exec"),
        }
    }
}
