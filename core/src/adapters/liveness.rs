//! Process liveness checks for registry ownership.

use crate::ports::ProcessLiveness;

/// Checks liveness against the host's process table.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsProcessLiveness;

impl OsProcessLiveness {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(unix)]
impl ProcessLiveness for OsProcessLiveness {
    fn is_alive(&self, pid: u32) -> bool {
        use nix::errno::Errno;
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        let Ok(raw) = i32::try_from(pid) else {
            return false;
        };
        if raw <= 0 {
            return false;
        }

        // Signal 0 only performs the existence and permission checks
        match kill(Pid::from_raw(raw), None) {
            Ok(()) => true,
            // The process exists but belongs to someone else
            Err(Errno::EPERM) => true,
            Err(_) => false,
        }
    }
}

#[cfg(not(unix))]
impl ProcessLiveness for OsProcessLiveness {
    fn is_alive(&self, pid: u32) -> bool {
        use std::process::{Command, Stdio};

        if pid == 0 {
            return false;
        }

        let output = match Command::new("tasklist")
            .args(["/FI", &format!("PID eq {}", pid), "/NH", "/FO", "CSV"])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
        {
            Ok(output) => output,
            Err(_) => return false,
        };

        let needle = format!("\"{}\"", pid);
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .any(|line| line.contains(&needle))
    }
}
