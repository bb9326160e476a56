//! Persistent interactive shell (spec.md §4.H).
//!
//! A single long-lived shell child process backs every `CLI` node in a run,
//! so `cd`, exported variables, and other session state survive between
//! nodes. Commands are framed with a UUID end-marker; when the marker line
//! reappears on stdout we know the command has finished and can read its
//! exit code off the same line.

use std::process::Stdio;
use std::time::Duration;

use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use async_trait::async_trait;

use crate::collaborators::{Terminal, TerminalOutput};
use crate::error::{Error, Result};
use crate::shell::{Shell, ShellType};

/// Per-command timeout before the shell is killed and respawned.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

struct Session {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// A persistent shell process, reusable across many `CLI` node executions.
pub struct PersistentShell {
    shell: Shell,
    session: Mutex<Option<Session>>,
}

impl PersistentShell {
    pub fn new(shell: Shell) -> Self {
        Self {
            shell,
            session: Mutex::new(None),
        }
    }

    async fn spawn(&self) -> Result<Session> {
        let mut child = tokio::process::Command::new(&self.shell.shell_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = child.stdout.take().expect("piped stdout");

        Ok(Session {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    /// Run `command` in the persistent session, honoring `cancellation` and
    /// the per-command timeout. On timeout the session is killed and a fresh
    /// one spawned on the next call.
    pub async fn run(&self, command: &str, cancellation: &CancellationToken) -> Result<TerminalOutput> {
        let mut guard = self.session.lock().await;
        if guard.is_none() {
            *guard = Some(self.spawn().await?);
        }

        let marker = Uuid::new_v4().to_string();
        let framed = self.frame(command, &marker);

        let session = guard.as_mut().expect("just ensured");
        if session.stdin.write_all(framed.as_bytes()).await.is_err() || session.stdin.flush().await.is_err() {
            // Pipe broke (shell died); respawn for next time and surface failure.
            *guard = None;
            return Err(Error::ShellFailure("shell process is no longer running".into()));
        }

        let marker_re = Regex::new(&format!(r"^{}:(-?\d+)$", regex::escape(&marker))).unwrap();
        let mut collected = Vec::new();

        let read_loop = async {
            loop {
                let mut line = String::new();
                let n = session.stdout.read_line(&mut line).await?;
                if n == 0 {
                    return Err(Error::ShellFailure("shell closed its output stream".into()));
                }
                let trimmed = line.trim_end_matches(['\n', '\r']);
                if let Some(caps) = marker_re.captures(trimmed) {
                    let exit_code: i32 = caps[1].parse().unwrap_or(-1);
                    return Ok(exit_code);
                }
                if is_banner_line(trimmed) {
                    continue;
                }
                collected.push(trimmed.to_string());
            }
        };

        tokio::select! {
            _ = cancellation.cancelled() => {
                session.child.start_kill().ok();
                *guard = None;
                Err(Error::Aborted)
            }
            _ = tokio::time::sleep(COMMAND_TIMEOUT) => {
                session.child.start_kill().ok();
                *guard = None;
                Err(Error::ShellTimeout(COMMAND_TIMEOUT))
            }
            result = read_loop => {
                let exit_code = result?;
                Ok(TerminalOutput {
                    stdout: collected.join("\n"),
                    stderr: String::new(),
                    exit_code,
                })
            }
        }
    }

    /// Wrap `command` so stderr is folded into stdout and the exit code is
    /// echoed alongside `marker` once the command completes.
    fn frame(&self, command: &str, marker: &str) -> String {
        match self.shell.shell_type {
            ShellType::PowerShell => {
                format!("{command} 2>&1\necho \"{marker}:$LASTEXITCODE\"\n")
            }
            ShellType::Cmd => {
                format!("{command} 2>&1\necho {marker}:%errorlevel%\n")
            }
            ShellType::Zsh | ShellType::Bash | ShellType::Sh => {
                format!("{command} 2>&1\necho \"{marker}:$?\"\n")
            }
        }
    }
}

#[async_trait]
impl Terminal for PersistentShell {
    async fn run(&self, command: &str, cancellation: &CancellationToken) -> Result<TerminalOutput> {
        PersistentShell::run(self, command, cancellation).await
    }
}

/// Windows shells print a banner and prompt before the first real output;
/// filter those lines out of the captured stdout.
fn is_banner_line(line: &str) -> bool {
    static PROMPT_RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let prompt_re = PROMPT_RE.get_or_init(|| Regex::new(r"^[A-Za-z]:\\.*>.*$").unwrap());

    line.contains("(c) Microsoft Corporation.")
        || line.contains("Microsoft Windows")
        || prompt_re.is_match(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_lines_are_detected() {
        assert!(is_banner_line("Microsoft Windows [Version 10.0.19045.1]"));
        assert!(is_banner_line(
            "(c) Microsoft Corporation. All rights reserved."
        ));
        assert!(is_banner_line(r"C:\Users\me>echo hi"));
        assert!(!is_banner_line("hello world"));
    }

    #[test]
    fn frame_unix_echoes_dollar_question() {
        let shell = Shell {
            shell_type: ShellType::Bash,
            shell_path: std::path::PathBuf::from("/bin/bash"),
        };
        let ps = PersistentShell::new(shell);
        let framed = ps.frame("echo hi", "marker-1");
        assert!(framed.contains("echo hi 2>&1"));
        assert!(framed.contains("marker-1:$?"));
    }

    #[test]
    fn frame_powershell_uses_lastexitcode() {
        let shell = Shell {
            shell_type: ShellType::PowerShell,
            shell_path: std::path::PathBuf::from("pwsh"),
        };
        let ps = PersistentShell::new(shell);
        let framed = ps.frame("Write-Host hi", "marker-2");
        assert!(framed.contains("$LASTEXITCODE"));
    }

    #[tokio::test]
    async fn run_executes_command_and_captures_output() {
        let shell = Shell {
            shell_type: ShellType::Sh,
            shell_path: std::path::PathBuf::from("/bin/sh"),
        };
        let ps = PersistentShell::new(shell);
        let token = CancellationToken::new();
        let out = ps.run("echo hello", &token).await.unwrap();
        assert_eq!(out.stdout, "hello");
        assert_eq!(out.exit_code, 0);
    }

    #[tokio::test]
    async fn run_reports_nonzero_exit_code() {
        let shell = Shell {
            shell_type: ShellType::Sh,
            shell_path: std::path::PathBuf::from("/bin/sh"),
        };
        let ps = PersistentShell::new(shell);
        let token = CancellationToken::new();
        let out = ps.run("exit 7", &token).await.unwrap();
        assert_eq!(out.exit_code, 7);
    }

    #[tokio::test]
    async fn session_persists_state_across_commands() {
        let shell = Shell {
            shell_type: ShellType::Sh,
            shell_path: std::path::PathBuf::from("/bin/sh"),
        };
        let ps = PersistentShell::new(shell);
        let token = CancellationToken::new();
        ps.run("FOO=bar", &token).await.unwrap();
        let out = ps.run("echo $FOO", &token).await.unwrap();
        assert_eq!(out.stdout, "bar");
    }
}
