use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::command::{BuiltCommand, CommandBuilder};
use crate::exec::{ExecError, NativeExecutor, ProcessExecutor, ProcessOutput};
use crate::interpret::{as_json, JsonReply, Payload};
use crate::retry::{command_key, Failure, RetryPolicy, TimeoutTable};
use crate::stream::{spawn_stream, OutputStream};
use crate::target::ExecutionTarget;

const WARNING_PREVIEW_CHARS: usize = 200;
const CONNECTION_REFUSED_MESSAGE: &str = "Connection refused. Is the OpenClaw Gateway running?";

/// Outcome of one logical CLI invocation, after any retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CliResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
}

impl CliResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn timed_out(&self) -> bool {
        self.failure == Some(Failure::Timeout)
    }

    /// stderr, then stdout, whichever has content first.
    pub fn error_text(&self) -> Option<&str> {
        [self.stderr.as_str(), self.stdout.as_str()]
            .into_iter()
            .find(|text| !text.trim().is_empty())
    }

    /// stdout followed by stderr, as shown for diagnostic commands.
    pub fn combined_output(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// Per-call overrides of the runner's defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub timeout: Option<Duration>,
    pub attempts: Option<u32>,
}

impl RunOptions {
    pub fn attempts(attempts: u32) -> Self {
        Self {
            attempts: Some(attempts),
            ..Self::default()
        }
    }

    pub fn timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::default()
        }
    }
}

/// Builds, runs and retries OpenClaw CLI invocations.
#[derive(Clone)]
pub struct CliRunner {
    builder: CommandBuilder,
    executor: Arc<dyn ProcessExecutor>,
    timeouts: TimeoutTable,
    policy: RetryPolicy,
}

impl CliRunner {
    pub fn new(builder: CommandBuilder) -> Self {
        Self {
            builder,
            executor: Arc::new(NativeExecutor),
            timeouts: TimeoutTable::default(),
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_executor(mut self, executor: Arc<dyn ProcessExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutTable) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn builder(&self) -> &CommandBuilder {
        &self.builder
    }

    pub fn target(&self) -> &ExecutionTarget {
        self.builder.target()
    }

    pub fn policy_for<S: AsRef<str>>(&self, tokens: &[S], options: RunOptions) -> RetryPolicy {
        RetryPolicy {
            max_attempts: options.attempts.unwrap_or(self.policy.max_attempts).max(1),
            timeout: options
                .timeout
                .unwrap_or_else(|| self.timeouts.lookup(tokens)),
            ..self.policy.clone()
        }
    }

    pub async fn run<S: AsRef<str>>(&self, tokens: &[S]) -> CliResult {
        self.run_with(tokens, RunOptions::default()).await
    }

    pub async fn run_with<S: AsRef<str>>(&self, tokens: &[S], options: RunOptions) -> CliResult {
        let policy = self.policy_for(tokens, options);
        let command = self.builder.build_oneshot(tokens);
        self.run_built(&command_key(tokens), &command, &policy).await
    }

    /// Runs a fixed helper script in the same environment as the CLI.
    pub async fn run_script(&self, script: &str, options: RunOptions) -> CliResult {
        let policy = RetryPolicy {
            max_attempts: options.attempts.unwrap_or(1).max(1),
            timeout: options
                .timeout
                .unwrap_or_else(|| self.timeouts.default_timeout()),
            ..self.policy.clone()
        };
        let command = self.builder.build_script(script);
        self.run_built("script", &command, &policy).await
    }

    /// Runs an already built command under `policy`.
    pub async fn run_built(
        &self,
        key: &str,
        command: &BuiltCommand,
        policy: &RetryPolicy,
    ) -> CliResult {
        let started = Instant::now();
        let attempts = policy.attempts();
        let mut made = 0;
        let mut last: Option<(Failure, Result<ProcessOutput, ExecError>)> = None;

        for attempt in 1..=attempts {
            made = attempt;
            tracing::debug!("running `{command}` (attempt {attempt}/{attempts})");
            let outcome = match self.executor.execute(command, policy.timeout).await {
                Ok(output) if output.success() => {
                    return succeeded(key, output, attempt, elapsed_ms(started));
                }
                other => other,
            };
            let Some(failure) = Failure::classify(&outcome) else {
                continue;
            };

            let terminal = failure.is_terminal();
            last = Some((failure, outcome));
            if terminal {
                tracing::debug!("openclaw {key} failed with {failure:?}, not retrying");
                break;
            }

            if attempt < attempts {
                let delay = policy.backoff_delay(attempt);
                tracing::warn!(
                    "openclaw {key} attempt {}/{attempts} after {}ms ({failure:?})",
                    attempt + 1,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }
        }

        let duration_ms = elapsed_ms(started);
        match last {
            Some((failure, outcome)) => exhausted(failure, outcome, made, duration_ms),
            None => CliResult {
                stdout: String::new(),
                stderr: "Unknown error".to_string(),
                exit_code: 1,
                duration_ms,
                retries: Some(made),
                failure: None,
            },
        }
    }

    /// Spawns the argv form of `tokens` for incremental output.
    pub fn stream<S: AsRef<str>>(&self, tokens: &[S]) -> Result<OutputStream, ExecError> {
        let command = self.builder.build_spawn(tokens);
        tracing::debug!("streaming `{command}`");
        spawn_stream(&command)
    }

    pub async fn run_json<T, S>(&self, tokens: &[S]) -> JsonReply<Payload<T>>
    where
        T: serde::de::DeserializeOwned,
        S: AsRef<str>,
    {
        as_json(&self.run(tokens).await)
    }

    /// `openclaw gateway call <method> --params <json>`.
    pub async fn gateway_call<T>(
        &self,
        method: &str,
        params: &serde_json::Value,
    ) -> JsonReply<Payload<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        let params = params.to_string();
        self.run_json(&["gateway", "call", method, "--params", params.as_str()])
            .await
    }
}

fn succeeded(key: &str, output: ProcessOutput, attempt: u32, duration_ms: u64) -> CliResult {
    if !output.stderr.trim().is_empty() {
        let preview: String = output.stderr.chars().take(WARNING_PREVIEW_CHARS).collect();
        tracing::warn!("openclaw {key} succeeded with warnings: {preview}");
    }
    CliResult {
        stdout: output.stdout,
        stderr: output.stderr,
        exit_code: 0,
        duration_ms,
        retries: (attempt > 1).then_some(attempt),
        failure: None,
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn mentions_connection_refused(text: &str) -> bool {
    text.contains("ECONNREFUSED") || text.to_ascii_lowercase().contains("connection refused")
}

fn exhausted(
    failure: Failure,
    outcome: Result<ProcessOutput, ExecError>,
    attempts: u32,
    duration_ms: u64,
) -> CliResult {
    let (stdout, detail) = match outcome {
        Ok(output) => {
            let detail = if !output.stderr.trim().is_empty() {
                output.stderr
            } else if !output.stdout.trim().is_empty() {
                output.stdout.clone()
            } else {
                format!("Command exited with code {}", output.exit_code)
            };
            (output.stdout, detail)
        }
        Err(err) => (String::new(), err.to_string()),
    };

    let stderr = match failure {
        Failure::Timeout => detail.replacen("command timed out", "Command timed out", 1),
        _ if mentions_connection_refused(&detail) => CONNECTION_REFUSED_MESSAGE.to_string(),
        _ => detail,
    };

    CliResult {
        stdout,
        stderr,
        exit_code: failure.exit_code(),
        duration_ms,
        retries: Some(attempts),
        failure: Some(failure),
    }
}
