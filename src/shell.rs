//! Shell detection and execution utilities.
//!
//! This module provides shell type detection, path resolution, and command
//! argument derivation for cross-platform shell execution.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Supported shell types for command execution.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum ShellType {
    Zsh,
    Bash,
    PowerShell,
    Sh,
    Cmd,
}

/// A resolved shell with its type and path.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Shell {
    pub shell_type: ShellType,
    pub shell_path: PathBuf,
}

impl Shell {
    /// Returns the canonical name for this shell type.
    pub fn name(&self) -> &'static str {
        match self.shell_type {
            ShellType::Zsh => "zsh",
            ShellType::Bash => "bash",
            ShellType::PowerShell => "powershell",
            ShellType::Sh => "sh",
            ShellType::Cmd => "cmd",
        }
    }

}

/// Get the user's default shell path from the system.
#[cfg(unix)]
fn get_user_shell_path() -> Option<PathBuf> {
    use libc::{getpwuid, getuid};
    use std::ffi::CStr;

    unsafe {
        let uid = getuid();
        let pw = getpwuid(uid);

        if !pw.is_null() {
            let shell_path = CStr::from_ptr((*pw).pw_shell)
                .to_string_lossy()
                .into_owned();
            Some(PathBuf::from(shell_path))
        } else {
            None
        }
    }
}

#[cfg(not(unix))]
fn get_user_shell_path() -> Option<PathBuf> {
    None
}

/// Check if a file exists at the given path.
fn file_exists(path: &PathBuf) -> Option<PathBuf> {
    if std::fs::metadata(path).is_ok_and(|metadata| metadata.is_file()) {
        Some(path.clone())
    } else {
        None
    }
}

/// Resolve a shell path, checking provided path, user default, which, and fallbacks.
fn get_shell_path(
    shell_type: ShellType,
    provided_path: Option<&PathBuf>,
    binary_name: &str,
    fallback_paths: &[&str],
) -> Option<PathBuf> {
    // If exact provided path exists, use it
    if provided_path.and_then(file_exists).is_some() {
        return provided_path.cloned();
    }

    // Check if the shell we are trying to load is user's default shell
    let default_shell_path = get_user_shell_path();
    if let Some(ref default_path) = default_shell_path {
        if detect_shell_type(default_path) == Some(shell_type) {
            return default_shell_path;
        }
    }

    // Try to find via which
    if let Ok(path) = which::which(binary_name) {
        return Some(path);
    }

    // Check fallback paths
    for path in fallback_paths {
        if let Some(path) = file_exists(&PathBuf::from(path)) {
            return Some(path);
        }
    }

    None
}

fn get_zsh_shell(path: Option<&PathBuf>) -> Option<Shell> {
    get_shell_path(ShellType::Zsh, path, "zsh", &["/bin/zsh"]).map(|shell_path| Shell {
        shell_type: ShellType::Zsh,
        shell_path,
    })
}

fn get_bash_shell(path: Option<&PathBuf>) -> Option<Shell> {
    get_shell_path(ShellType::Bash, path, "bash", &["/bin/bash"]).map(|shell_path| Shell {
        shell_type: ShellType::Bash,
        shell_path,
    })
}

fn get_sh_shell(path: Option<&PathBuf>) -> Option<Shell> {
    get_shell_path(ShellType::Sh, path, "sh", &["/bin/sh"]).map(|shell_path| Shell {
        shell_type: ShellType::Sh,
        shell_path,
    })
}

fn get_powershell_shell(path: Option<&PathBuf>) -> Option<Shell> {
    get_shell_path(
        ShellType::PowerShell,
        path,
        "pwsh",
        &["/usr/local/bin/pwsh"],
    )
    .or_else(|| get_shell_path(ShellType::PowerShell, path, "powershell", &[]))
    .map(|shell_path| Shell {
        shell_type: ShellType::PowerShell,
        shell_path,
    })
}

fn get_cmd_shell(path: Option<&PathBuf>) -> Option<Shell> {
    get_shell_path(ShellType::Cmd, path, "cmd", &[]).map(|shell_path| Shell {
        shell_type: ShellType::Cmd,
        shell_path,
    })
}

/// Returns the ultimate fallback shell when nothing else works.
fn ultimate_fallback_shell() -> Shell {
    if cfg!(windows) {
        Shell {
            shell_type: ShellType::Cmd,
            shell_path: PathBuf::from("cmd.exe"),
        }
    } else {
        Shell {
            shell_type: ShellType::Sh,
            shell_path: PathBuf::from("/bin/sh"),
        }
    }
}

/// Get a shell by looking up the model-provided path.
pub fn get_shell_by_model_provided_path(shell_path: &PathBuf) -> Shell {
    detect_shell_type(shell_path)
        .and_then(|shell_type| get_shell(shell_type, Some(shell_path)))
        .unwrap_or_else(ultimate_fallback_shell)
}

/// Get a specific shell type, optionally from a specific path.
pub fn get_shell(shell_type: ShellType, path: Option<&PathBuf>) -> Option<Shell> {
    match shell_type {
        ShellType::Zsh => get_zsh_shell(path),
        ShellType::Bash => get_bash_shell(path),
        ShellType::PowerShell => get_powershell_shell(path),
        ShellType::Sh => get_sh_shell(path),
        ShellType::Cmd => get_cmd_shell(path),
    }
}

/// Detect the shell type from a path by examining the filename.
pub fn detect_shell_type(shell_path: &PathBuf) -> Option<ShellType> {
    match shell_path.as_os_str().to_str() {
        Some("zsh") => Some(ShellType::Zsh),
        Some("sh") => Some(ShellType::Sh),
        Some("cmd") => Some(ShellType::Cmd),
        Some("bash") => Some(ShellType::Bash),
        Some("pwsh") => Some(ShellType::PowerShell),
        Some("powershell") => Some(ShellType::PowerShell),
        _ => {
            // Try extracting the file stem (e.g., "zsh" from "/bin/zsh")
            let shell_name = shell_path.file_stem()?;
            let shell_name_path = PathBuf::from(shell_name);
            if shell_name_path != *shell_path {
                detect_shell_type(&shell_name_path)
            } else {
                None
            }
        }
    }
}

/// Get the user's default shell with platform-appropriate fallbacks.
pub fn default_user_shell() -> Shell {
    default_user_shell_from_path(get_user_shell_path())
}

fn default_user_shell_from_path(user_shell_path: Option<PathBuf>) -> Shell {
    if cfg!(windows) {
        get_shell(ShellType::PowerShell, None).unwrap_or_else(ultimate_fallback_shell)
    } else {
        let user_default_shell = user_shell_path
            .and_then(|shell| detect_shell_type(&shell))
            .and_then(|shell_type| get_shell(shell_type, None));

        let shell_with_fallback = if cfg!(target_os = "macos") {
            user_default_shell
                .or_else(|| get_shell(ShellType::Zsh, None))
                .or_else(|| get_shell(ShellType::Bash, None))
        } else {
            user_default_shell
                .or_else(|| get_shell(ShellType::Bash, None))
                .or_else(|| get_shell(ShellType::Zsh, None))
        };

        shell_with_fallback.unwrap_or_else(ultimate_fallback_shell)
    }
}
