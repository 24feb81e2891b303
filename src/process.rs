/*
 * process.rs
 *
 * fork/waitpid primitives and wait-status decoding.
 *
 * fork, not posix_spawn: the launcher must run code between fork and exec
 * (restore signal dispositions, close the report descriptor), and only
 * fork gives us that window.
 */

use crate::error::{Result, SupervisorError};

/// Which side of the fork we are on.
pub enum Fork {
    /// Supervisor side, holding the child's pid.
    Parent(libc::pid_t),
    /// Launcher side. Must not return to the caller's logic.
    Child,
}

/// Create the child. Exactly one call per supervisor lifetime.
pub fn fork() -> Result<Fork> {
    // SAFETY: fork has no preconditions; the child only runs
    // async-signal-safe code until execv (see launcher.rs).
    let pid = unsafe { libc::fork() };
    match pid {
        -1 => {
            let errno = std::io::Error::last_os_error().raw_os_error().unwrap_or(0);
            Err(SupervisorError::Fork(errno))
        }
        0 => Ok(Fork::Child),
        pid => Ok(Fork::Parent(pid)),
    }
}

/// Raw status word from waitpid, undecoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    raw: i32,
}

/// What ended the child, as the report names it.
///
/// These four literals are the complete value space of the report's
/// `status_type` field and are emitted without escaping - keep them
/// ASCII identifiers if the schema ever grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Exited,
    Killed,
    CoreDump,
    Unknown,
}

impl StatusKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exited => "exited",
            Self::Killed => "killed",
            Self::CoreDump => "core_dump",
            Self::Unknown => "unknown",
        }
    }
}

/// Decoded wait status: the kind plus its numeric payload (exit code or
/// signal number; -1 for unknown).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedStatus {
    pub kind: StatusKind,
    pub value: i32,
}

impl DecodedStatus {
    /// Defensive fallback for states no POSIX system should produce,
    /// and for waitpid failure.
    #[must_use]
    pub const fn unknown() -> Self {
        Self {
            kind: StatusKind::Unknown,
            value: -1,
        }
    }
}

impl ExitStatus {
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        Self { raw }
    }

    /// Decode per the report contract: exited -> exit code, signaled
    /// without core -> killed + signo, with core -> core_dump + signo,
    /// anything else -> unknown/-1.
    #[must_use]
    pub fn decode(self) -> DecodedStatus {
        if libc::WIFEXITED(self.raw) {
            DecodedStatus {
                kind: StatusKind::Exited,
                value: libc::WEXITSTATUS(self.raw),
            }
        } else if libc::WIFSIGNALED(self.raw) {
            let kind = if libc::WCOREDUMP(self.raw) {
                StatusKind::CoreDump
            } else {
                StatusKind::Killed
            };
            DecodedStatus {
                kind,
                value: libc::WTERMSIG(self.raw),
            }
        } else {
            DecodedStatus::unknown()
        }
    }
}

/// Non-blocking status check. Ok(None) means still running; Err carries
/// errno from waitpid (which the reap loop downgrades to an unknown
/// status rather than crashing).
pub fn try_wait(pid: libc::pid_t) -> core::result::Result<Option<ExitStatus>, i32> {
    let mut status: i32 = 0;
    // SAFETY: pid came from fork; status is a valid out-pointer.
    let ret = unsafe { libc::waitpid(pid, &raw mut status, libc::WNOHANG) };
    match ret {
        -1 => Err(std::io::Error::last_os_error().raw_os_error().unwrap_or(0)),
        0 => Ok(None),
        _ => Ok(Some(ExitStatus::from_raw(status))),
    }
}
