#![cfg(unix)]

use std::time::{Duration, Instant};

use clawplane_runtime::*;
use tokio_stream::StreamExt;

const AWKWARD_TOKENS: &[&str] = &[
    "plain",
    "it's",
    "two words",
    r"back\slash",
    "",
    "$HOME",
    "`id`",
    "semi;colon",
    r#"double "quoted""#,
    "'''",
    "--flag=value with space",
];

fn builder(program: &str) -> CommandBuilder {
    CommandBuilder::with_program(program, ExecutionTarget::native())
}

/// `printf '<%s>\n' tok...` prints every token back on its own line.
fn echo_tokens(tokens: &[&str]) -> Vec<String> {
    let mut all = vec![r"<%s>\n"];
    all.extend_from_slice(tokens);
    all.into_iter().map(String::from).collect()
}

fn expected_lines(tokens: &[&str]) -> String {
    tokens.iter().map(|t| format!("<{t}>\n")).collect()
}

async fn run(command: &BuiltCommand) -> ProcessOutput {
    NativeExecutor
        .execute(command, Duration::from_secs(10))
        .await
        .unwrap()
}

#[tokio::test]
async fn shell_string_round_trips_tokens() {
    let builder = builder("printf");
    let output = run(&builder.build_shell(&echo_tokens(AWKWARD_TOKENS))).await;
    assert!(output.success(), "stderr: {}", output.stderr);
    assert_eq!(output.stdout, expected_lines(AWKWARD_TOKENS));
}

#[tokio::test]
async fn nested_single_quotes_survive_the_login_shell_wrapper() {
    let builder = CommandBuilder::with_program("printf", ExecutionTarget::wsl(None));
    let line = builder.shell_string(&echo_tokens(AWKWARD_TOKENS));
    let inner = line
        .strip_prefix("wsl -- bash -lc ")
        .expect("wsl wrapper prefix");

    // Same nesting, with sh standing in for the WSL login shell.
    let output = run(&BuiltCommand::Shell(format!("sh -c {inner}"))).await;
    assert!(output.success(), "stderr: {}", output.stderr);
    assert_eq!(output.stdout, expected_lines(AWKWARD_TOKENS));
}

#[tokio::test]
async fn shell_and_spawn_forms_are_equivalent() {
    let cases: Vec<(&str, Vec<String>)> = vec![
        ("printf", echo_tokens(AWKWARD_TOKENS)),
        (
            "sh",
            vec!["-c".into(), "echo out; echo 'it is' >&2; exit 3".into()],
        ),
        ("sh", vec!["-c".into(), r#"printf '%s' "$0""#.into(), "it's here".into()]),
    ];

    for (program, tokens) in cases {
        let builder = builder(program);
        let shell = run(&builder.build_shell(&tokens)).await;
        let spawn = run(&builder.build_spawn(&tokens)).await;
        assert_eq!(shell.stdout, spawn.stdout, "{program} {tokens:?}");
        assert_eq!(shell.stderr, spawn.stderr, "{program} {tokens:?}");
        assert_eq!(shell.exit_code, spawn.exit_code, "{program} {tokens:?}");
    }
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(20),
        ..RetryPolicy::default()
    }
}

#[tokio::test]
async fn runaway_command_is_stopped_at_its_timeout() {
    let runner = CliRunner::new(builder("sleep"));
    let started = Instant::now();
    let result = runner
        .run_with(&["30"], RunOptions::timeout(Duration::from_millis(300)))
        .await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(result.timed_out());
    assert_eq!(result.exit_code, TIMEOUT_EXIT_CODE);
    assert_eq!(result.stderr, "Command timed out after 300ms");
}

#[tokio::test]
async fn transient_failure_runs_exactly_max_attempts() {
    let dir = tempfile::tempdir().unwrap();
    let counter = dir.path().join("attempts");
    let script = format!("echo x >> '{}'; echo busy >&2; exit 1", counter.display());

    let runner = CliRunner::new(builder("sh")).with_policy(fast_policy());
    let result = runner
        .run_with(&["-c", script.as_str()], RunOptions::attempts(3))
        .await;

    let attempts = std::fs::read_to_string(&counter).unwrap().lines().count();
    assert_eq!(attempts, 3);
    assert_eq!(result.retries, Some(3));
    assert_eq!(result.exit_code, 1);
    assert_eq!(result.stderr, "busy\n");
}

#[tokio::test]
async fn command_not_found_is_attempted_once() {
    let dir = tempfile::tempdir().unwrap();
    let counter = dir.path().join("attempts");
    let script = format!("echo x >> '{}'; exit 127", counter.display());

    let runner = CliRunner::new(builder("sh")).with_policy(fast_policy());
    let result = runner
        .run_with(&["-c", script.as_str()], RunOptions::attempts(5))
        .await;

    let attempts = std::fs::read_to_string(&counter).unwrap().lines().count();
    assert_eq!(attempts, 1);
    assert_eq!(result.retries, Some(1));
    assert_eq!(result.failure, Some(Failure::Exited(127)));
}

#[tokio::test]
async fn missing_program_is_terminal() {
    let runner = CliRunner::new(builder("clawplane-no-such-openclaw")).with_policy(fast_policy());
    let result = runner
        .run_with(&["status"], RunOptions::attempts(4))
        .await;
    assert_eq!(result.retries, Some(1));
    assert_eq!(result.exit_code, 127);
    assert!(!result.success());
}

#[tokio::test]
async fn warnings_on_success_are_kept() {
    let runner = CliRunner::new(builder("sh"));
    let result = runner
        .run(&["-c", "echo deprecated >&2; echo '{\"ok\":true}'"])
        .await;
    assert!(result.success());
    assert_eq!(result.stderr, "deprecated\n");

    let reply = as_json::<serde_json::Value>(&result);
    assert_eq!(
        reply.data.map(Payload::into_value),
        Some(serde_json::json!({ "ok": true }))
    );
}

#[tokio::test]
async fn runner_streams_the_spawn_form() {
    let runner = CliRunner::new(builder("sh"));
    let events: Vec<StreamEvent> = runner
        .stream(&["-c", "echo it\\'s; echo warn >&2"])
        .unwrap()
        .collect()
        .await;

    assert!(events.contains(&StreamEvent::Stdout("it's".into())));
    assert!(events.contains(&StreamEvent::Stderr("warn".into())));
    assert_eq!(events.last(), Some(&StreamEvent::Exit { code: Some(0) }));
}
