//! Platform abstraction for shell invocation and process cleanup

use serde::{Deserialize, Serialize};
use tokio::process::Command as TokioCommand;
use tracing::debug;

/// Platform identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    Linux,
    MacOS,
    Windows,
    Unknown,
}

impl Platform {
    /// Get current platform
    pub fn current() -> Self {
        if cfg!(target_os = "linux") {
            Platform::Linux
        } else if cfg!(target_os = "macos") {
            Platform::MacOS
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Unknown
        }
    }

    /// Check if platform is Unix-like
    pub fn is_unix(&self) -> bool {
        matches!(self, Platform::Linux | Platform::MacOS)
    }

    /// Get platform name as string
    pub fn name(&self) -> &str {
        match self {
            Platform::Linux => "linux",
            Platform::MacOS => "macos",
            Platform::Windows => "windows",
            Platform::Unknown => "unknown",
        }
    }

    /// Get default shell for platform
    pub fn default_shell(&self) -> &str {
        match self {
            Platform::Linux | Platform::MacOS => "/bin/sh",
            Platform::Windows => "cmd.exe",
            Platform::Unknown => "sh",
        }
    }

    /// Flag that makes the shell run its next argument as a script
    pub fn shell_flag(&self) -> &str {
        match self {
            Platform::Windows => "/C",
            _ => "-c",
        }
    }

    /// Command that hands `line` to the shell verbatim
    pub fn shell_command(&self, line: &str) -> TokioCommand {
        let mut cmd = TokioCommand::new(self.default_shell());
        cmd.arg(self.shell_flag()).arg(line);
        cmd
    }
}

/// Put the child in a fresh process group so its descendants can be
/// signalled together.
#[cfg(unix)]
pub fn isolate_process_group(cmd: &mut TokioCommand) {
    unsafe {
        cmd.pre_exec(|| {
            if libc::setpgid(0, 0) != 0 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

#[cfg(not(unix))]
pub fn isolate_process_group(_cmd: &mut TokioCommand) {}

/// SIGKILL every process in the group led by `pid`. Best effort: the group
/// may already be gone.
#[cfg(unix)]
pub fn kill_process_group(pid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        Ok(()) => debug!("Killed process group {}", pid),
        Err(e) => debug!("Process group {} not signalled: {}", pid, e),
    }
}

// Without process groups only the direct child is reaped, via kill_on_drop.
#[cfg(not(unix))]
pub fn kill_process_group(pid: u32) {
    debug!("Process group kill unsupported; relying on child kill for {}", pid);
}
