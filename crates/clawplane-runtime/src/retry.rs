use std::time::Duration;

use serde::Serialize;

use crate::exec::{ExecError, ProcessOutput, StartFailureKind};

/// Exit status a shell reports when the command was not found.
pub const SHELL_NOT_FOUND: i32 = 127;
/// Exit status a shell reports when the command was found but not executable.
pub const SHELL_NOT_EXECUTABLE: i32 = 126;
/// Exit code reported for attempts that hit their timeout.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Classified outcome of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Failure {
    Start(StartFailureKind),
    Timeout,
    Exited(i32),
}

impl Failure {
    pub fn classify(attempt: &Result<ProcessOutput, ExecError>) -> Option<Self> {
        match attempt {
            Ok(output) if output.success() => None,
            Ok(output) => Some(Self::Exited(output.exit_code)),
            Err(ExecError::Start { kind, .. }) => Some(Self::Start(*kind)),
            Err(ExecError::Timeout { .. }) => Some(Self::Timeout),
        }
    }

    /// Terminal failures are user or environment errors that another attempt
    /// cannot fix.
    pub fn is_terminal(self) -> bool {
        match self {
            Self::Start(kind) => kind != StartFailureKind::Other,
            Self::Exited(code) => code == SHELL_NOT_FOUND || code == SHELL_NOT_EXECUTABLE,
            Self::Timeout => false,
        }
    }

    pub fn exit_code(self) -> i32 {
        match self {
            Self::Exited(code) => code,
            Self::Timeout => TIMEOUT_EXIT_CODE,
            Self::Start(StartFailureKind::NotFound) => SHELL_NOT_FOUND,
            Self::Start(StartFailureKind::PermissionDenied | StartFailureKind::NotPermitted) => {
                SHELL_NOT_EXECUTABLE
            }
            Self::Start(StartFailureKind::Other) => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_millis(3_000),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): grows linearly with the
    /// attempt number and is capped at `max_delay`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(attempt.max(1))
            .min(self.max_delay)
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Commands known to need more (or less) than the default timeout, keyed by
/// their first one or two tokens.
const COMMAND_TIMEOUTS: &[(&str, Duration)] = &[
    ("gateway restart", Duration::from_secs(60)),
    ("cron add", Duration::from_secs(10)),
    ("cron remove", Duration::from_secs(10)),
    ("skills install", Duration::from_secs(120)),
    ("clawhub install", Duration::from_secs(120)),
    ("clawhub update", Duration::from_secs(120)),
    ("doctor", Duration::from_secs(60)),
];

/// `"cron add"` for `["cron", "add", "--name", ...]`.
pub fn command_key<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .take(2)
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone)]
pub struct TimeoutTable {
    entries: Vec<(String, Duration)>,
    default: Duration,
}

impl Default for TimeoutTable {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl TimeoutTable {
    pub fn new(default: Duration) -> Self {
        Self {
            entries: COMMAND_TIMEOUTS
                .iter()
                .map(|(key, timeout)| (key.to_string(), *timeout))
                .collect(),
            default,
        }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default
    }

    pub fn with_entry(mut self, key: impl Into<String>, timeout: Duration) -> Self {
        let key = key.into();
        self.entries.retain(|(k, _)| *k != key);
        self.entries.push((key, timeout));
        self
    }

    fn get(&self, key: &str) -> Option<Duration> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, timeout)| *timeout)
    }

    /// Two-token key first, then the bare subcommand, then the default.
    pub fn lookup<S: AsRef<str>>(&self, tokens: &[S]) -> Duration {
        let key = command_key(tokens);
        if let Some(timeout) = self.get(&key) {
            return timeout;
        }
        if let Some(timeout) = tokens.first().and_then(|first| self.get(first.as_ref())) {
            return timeout;
        }
        tracing::debug!(
            "no timeout entry for `{key}`, using default {}ms",
            self.default.as_millis()
        );
        self.default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(code: i32) -> Result<ProcessOutput, ExecError> {
        Ok(ProcessOutput {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: code,
            duration: Duration::ZERO,
        })
    }

    #[test]
    fn backoff_grows_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(1_000));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(2_000));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(3_000));
        assert_eq!(policy.backoff_delay(10), Duration::from_millis(3_000));
    }

    #[test]
    fn classify_outcomes() {
        assert_eq!(Failure::classify(&output(0)), None);
        assert_eq!(Failure::classify(&output(2)), Some(Failure::Exited(2)));
        let timeout = Err(ExecError::Timeout {
            timeout: Duration::from_secs(1),
        });
        assert_eq!(Failure::classify(&timeout), Some(Failure::Timeout));
        let missing = Err(ExecError::start(
            "openclaw",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        ));
        assert_eq!(
            Failure::classify(&missing),
            Some(Failure::Start(StartFailureKind::NotFound))
        );
    }

    #[test]
    fn terminal_failures() {
        assert!(Failure::Start(StartFailureKind::NotFound).is_terminal());
        assert!(Failure::Start(StartFailureKind::PermissionDenied).is_terminal());
        assert!(Failure::Start(StartFailureKind::NotPermitted).is_terminal());
        assert!(Failure::Exited(SHELL_NOT_FOUND).is_terminal());
        assert!(!Failure::Start(StartFailureKind::Other).is_terminal());
        assert!(!Failure::Timeout.is_terminal());
        assert!(!Failure::Exited(1).is_terminal());
    }

    #[test]
    fn timeout_lookup() {
        let table = TimeoutTable::default();
        assert_eq!(
            table.lookup(&["gateway", "restart"]),
            Duration::from_secs(60)
        );
        assert_eq!(
            table.lookup(&["skills", "install", "--foo"]),
            Duration::from_secs(120)
        );
        assert_eq!(table.lookup(&["doctor"]), Duration::from_secs(60));
        assert_eq!(table.lookup(&["doctor", "--fix"]), Duration::from_secs(60));
        assert_eq!(table.lookup(&["cron", "list"]), DEFAULT_TIMEOUT);
        assert_eq!(table.lookup::<&str>(&[]), DEFAULT_TIMEOUT);
    }

    #[test]
    fn table_entries_can_be_overridden() {
        let table = TimeoutTable::new(Duration::from_secs(5))
            .with_entry("cron add", Duration::from_secs(1));
        assert_eq!(table.lookup(&["cron", "add"]), Duration::from_secs(1));
        assert_eq!(table.lookup(&["cron", "list"]), Duration::from_secs(5));
    }
}
