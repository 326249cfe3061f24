//! Turns argument tokens into something a process can be spawned from.

use std::fmt;

use serde::Serialize;

use crate::target::ExecutionTarget;

pub const DEFAULT_PROGRAM: &str = "openclaw";
const WSL_PROGRAM: &str = "wsl";

/// Program plus argv, passed to the OS without a shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpawnSpec {
    pub program: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuiltCommand {
    /// A single command line handed to the platform shell.
    Shell(String),
    Spawn(SpawnSpec),
}

impl BuiltCommand {
    /// Name of the binary that has to exist for this command to start.
    pub fn program(&self) -> &str {
        match self {
            Self::Shell(_) => shell_program(),
            Self::Spawn(spec) => &spec.program,
        }
    }

    pub fn to_command(&self) -> tokio::process::Command {
        match self {
            Self::Shell(line) => {
                let mut cmd = tokio::process::Command::new(shell_program());
                cmd.arg(shell_flag()).arg(line);
                cmd
            }
            Self::Spawn(spec) => {
                let mut cmd = tokio::process::Command::new(&spec.program);
                cmd.args(&spec.args);
                cmd
            }
        }
    }
}

impl fmt::Display for BuiltCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shell(line) => f.write_str(line),
            Self::Spawn(spec) => {
                f.write_str(&spec.program)?;
                for arg in &spec.args {
                    write!(f, " {}", quote_token(arg))?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(unix)]
fn shell_program() -> &'static str {
    "sh"
}

#[cfg(unix)]
fn shell_flag() -> &'static str {
    "-c"
}

#[cfg(not(unix))]
fn shell_program() -> &'static str {
    "cmd"
}

#[cfg(not(unix))]
fn shell_flag() -> &'static str {
    "/C"
}

/// Builds both command forms for one execution target.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    program: String,
    target: ExecutionTarget,
}

impl CommandBuilder {
    pub fn new(target: ExecutionTarget) -> Self {
        Self::with_program(DEFAULT_PROGRAM, target)
    }

    pub fn with_program(program: impl Into<String>, target: ExecutionTarget) -> Self {
        Self {
            program: program.into(),
            target,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn target(&self) -> &ExecutionTarget {
        &self.target
    }

    /// `program tok1 tok2 ...` with every word that needs it single-quoted.
    pub fn logical_command<S: AsRef<str>>(&self, tokens: &[S]) -> String {
        let mut line = quote_token(&self.program);
        for token in tokens {
            line.push(' ');
            line.push_str(&quote_token(token.as_ref()));
        }
        line
    }

    pub fn shell_string<S: AsRef<str>>(&self, tokens: &[S]) -> String {
        let logical = self.logical_command(tokens);
        if !self.target.uses_indirection {
            return logical;
        }

        let mut line = String::from(WSL_PROGRAM);
        if let Some(distro) = &self.target.distro {
            line.push_str(" -d ");
            line.push_str(&quote_token(distro));
        }
        line.push_str(" -- bash -lc '");
        line.push_str(&escape_single_quotes(&logical));
        line.push('\'');
        line
    }

    pub fn spawn_spec<S: AsRef<str>>(&self, tokens: &[S]) -> SpawnSpec {
        if !self.target.uses_indirection {
            return SpawnSpec {
                program: self.program.clone(),
                args: tokens.iter().map(|t| t.as_ref().to_string()).collect(),
            };
        }

        let mut args = Vec::with_capacity(6);
        if let Some(distro) = &self.target.distro {
            args.push("-d".to_string());
            args.push(distro.clone());
        }
        args.extend(["--", "bash", "-lc"].map(String::from));
        args.push(self.logical_command(tokens));

        SpawnSpec {
            program: WSL_PROGRAM.to_string(),
            args,
        }
    }

    pub fn build_shell<S: AsRef<str>>(&self, tokens: &[S]) -> BuiltCommand {
        BuiltCommand::Shell(self.shell_string(tokens))
    }

    pub fn build_spawn<S: AsRef<str>>(&self, tokens: &[S]) -> BuiltCommand {
        BuiltCommand::Spawn(self.spawn_spec(tokens))
    }

    /// The form used for buffered calls. Through WSL this is the argv form,
    /// so `wsl` itself is the child the executor kills on timeout.
    pub fn build_oneshot<S: AsRef<str>>(&self, tokens: &[S]) -> BuiltCommand {
        if self.target.uses_indirection {
            self.build_spawn(tokens)
        } else {
            self.build_shell(tokens)
        }
    }

    /// Runs `script` verbatim in the target environment, bypassing the
    /// program. Only for fixed scripts, never for request data.
    pub fn build_script(&self, script: &str) -> BuiltCommand {
        if !self.target.uses_indirection {
            return BuiltCommand::Shell(script.to_string());
        }

        let mut args = Vec::with_capacity(6);
        if let Some(distro) = &self.target.distro {
            args.push("-d".to_string());
            args.push(distro.clone());
        }
        args.extend(["--", "bash", "-lc", script].map(String::from));
        BuiltCommand::Spawn(SpawnSpec {
            program: WSL_PROGRAM.to_string(),
            args,
        })
    }
}

/// `'` becomes `'\''` so the text can sit inside a single-quoted word.
pub fn escape_single_quotes(text: &str) -> String {
    text.replace('\'', r"'\''")
}

fn is_shell_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | '=' | ':' | ',' | '@' | '%' | '+')
}

/// Quotes a token for a POSIX shell. Tokens made only of safe characters are
/// returned unchanged.
pub fn quote_token(token: &str) -> String {
    if !token.is_empty() && token.chars().all(is_shell_safe) {
        return token.to_string();
    }
    format!("'{}'", escape_single_quotes(token))
}
