//! Long-running commands whose output is consumed line by line.

use std::pin::Pin;
use std::process::Stdio;

use futures_core::Stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::command::BuiltCommand;
use crate::exec::{exit_code, ExecError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Stdout(String),
    Stderr(String),
    /// Always the final item once the process has exited. `code` is `None`
    /// when the exit status could not be collected or the process was
    /// killed by a signal.
    Exit { code: Option<i32> },
}

impl StreamEvent {
    pub fn is_exit(&self) -> bool {
        matches!(self, Self::Exit { .. })
    }
}

pub type OutputStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Spawns `command` and returns its output as a stream.
///
/// The child is owned by the stream: dropping the stream before the `Exit`
/// event kills the process.
pub fn spawn_stream(command: &BuiltCommand) -> Result<OutputStream, ExecError> {
    let mut cmd = command.to_command();
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .map_err(|source| ExecError::start(command.program(), source))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let program = command.program().to_string();

    let stream = async_stream::stream! {
        let mut out_lines = stdout.map(|s| BufReader::new(s).split(b'\n'));
        let mut err_lines = stderr.map(|s| BufReader::new(s).split(b'\n'));

        loop {
            let event = tokio::select! {
                line = next_line(&mut out_lines), if out_lines.is_some() => match line {
                    Some(line) => StreamEvent::Stdout(line),
                    None => {
                        out_lines = None;
                        continue;
                    }
                },
                line = next_line(&mut err_lines), if err_lines.is_some() => match line {
                    Some(line) => StreamEvent::Stderr(line),
                    None => {
                        err_lines = None;
                        continue;
                    }
                },
                else => break,
            };
            yield event;
        }

        let code = match child.wait().await {
            Ok(status) => {
                let code = exit_code(&status);
                (code >= 0).then_some(code)
            }
            Err(e) => {
                tracing::warn!("failed to collect exit status of {program}: {e}");
                None
            }
        };
        tracing::debug!("streamed command {program} exited with {code:?}");
        yield StreamEvent::Exit { code };
    };

    Ok(Box::pin(stream))
}

/// Next line of one pipe, decoded lossily so a stray invalid byte never ends
/// the stream. `None` once the pipe is closed or unreadable.
async fn next_line<R>(lines: &mut Option<tokio::io::Split<R>>) -> Option<String>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    let lines = lines.as_mut()?;
    match lines.next_segment().await {
        Ok(Some(mut segment)) => {
            if segment.last() == Some(&b'\r') {
                segment.pop();
            }
            Some(String::from_utf8_lossy(&segment).into_owned())
        }
        Ok(None) => None,
        Err(e) => {
            tracing::warn!("stopped reading command output: {e}");
            None
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use tokio_stream::StreamExt;

    use super::*;

    fn sh(script: &str) -> BuiltCommand {
        BuiltCommand::Shell(script.to_string())
    }

    #[tokio::test]
    async fn yields_tagged_lines_then_exit() {
        let stream = spawn_stream(&sh("echo one; echo two; echo oops >&2; exit 4")).unwrap();
        let events: Vec<StreamEvent> = stream.collect().await;

        let stdout: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Stdout(line) => Some(line.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(stdout, vec!["one", "two"]);
        assert!(events.contains(&StreamEvent::Stderr("oops".into())));
        assert_eq!(events.last(), Some(&StreamEvent::Exit { code: Some(4) }));
        assert_eq!(events.iter().filter(|e| e.is_exit()).count(), 1);
    }

    #[tokio::test]
    async fn invalid_utf8_does_not_end_the_stream() {
        let stream = spawn_stream(&sh(r"printf 'one\n\377bad\r\ntwo\nthree\n'")).unwrap();
        let events: Vec<StreamEvent> = stream.collect().await;
        assert_eq!(
            events,
            vec![
                StreamEvent::Stdout("one".into()),
                StreamEvent::Stdout("\u{FFFD}bad".into()),
                StreamEvent::Stdout("two".into()),
                StreamEvent::Stdout("three".into()),
                StreamEvent::Exit { code: Some(0) },
            ]
        );
    }

    #[tokio::test]
    async fn dropping_the_stream_kills_the_child() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("still-running");
        let script = format!("echo started; sleep 1; touch {}", marker.display());

        let mut stream = spawn_stream(&sh(&script)).unwrap();
        assert_eq!(
            stream.next().await,
            Some(StreamEvent::Stdout("started".into()))
        );
        drop(stream);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn spawn_failure_is_reported() {
        let command = BuiltCommand::Spawn(crate::command::SpawnSpec {
            program: "clawplane-definitely-missing-binary".into(),
            args: vec![],
        });
        let result = spawn_stream(&command);
        assert!(matches!(result, Err(ExecError::Start { .. })));
    }
}
