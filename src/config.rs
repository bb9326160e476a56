//! Ambient per-run configuration: workspace trust, timeouts, and the shell
//! override path. Grouped the way the teacher threads a config struct
//! through its agent loop rather than passing each knob individually.

use std::path::PathBuf;
use std::time::Duration;

/// LLM node call timeout (spec.md §4.F.2).
pub const LLM_TIMEOUT: Duration = Duration::from_secs(60);

/// Maximum LLM response size before it's rejected as oversized.
pub const MAX_LLM_RESPONSE_CHARS: usize = 1_000_000;

/// Command heads a `CLI` node must never execute (spec.md §4.F.1).
pub const DISALLOWED_COMMAND_HEADS: &[&str] = &[
    "rm", "chmod", "shutdown", "history", "user", "sudo", "su", "passwd", "chown", "chgrp",
    "kill", "reboot", "poweroff", "init", "systemctl", "journalctl", "dmesg", "lsblk", "lsmod",
    "modprobe", "insmod", "rmmod", "lsusb", "lspci",
];

/// Settings that apply to an entire run, analogous to the teacher's agent
/// config but scoped to what this engine actually needs.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Working directory new CLI commands execute in; `None` inherits the
    /// process's own cwd.
    pub workspace_dir: Option<PathBuf>,
    /// Whether the workspace has been explicitly trusted by the embedder —
    /// an untrusted workspace still runs, but every CLI node is forced
    /// through the approval gate regardless of `needsUserApproval`.
    pub workspace_trusted: bool,
    /// Explicit shell override; falls back to [`crate::shell::default_user_shell`].
    pub shell_path: Option<PathBuf>,
    pub llm_timeout: Duration,
    pub shell_command_timeout: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workspace_dir: None,
            workspace_trusted: false,
            shell_path: None,
            llm_timeout: LLM_TIMEOUT,
            shell_command_timeout: crate::persistent_shell::COMMAND_TIMEOUT,
        }
    }
}
