/*
 * config.rs
 *
 * Two positional integers, nothing else. The parser is deliberately
 * stricter than str::parse: no sign, no leading zeros, no whitespace.
 * Anything surprising in argv is a reason to refuse to fork.
 *
 * The target program is fixed at compile time; PROCWRAP_TARGET overrides
 * it so test harnesses can substitute a payload.
 */

use std::ffi::CString;

use crate::error::{Result, SupervisorError};
use crate::signal::Signal;

/// Hard ceiling on the timeout. The caller budget is one minute; anything
/// longer is a configuration mistake, not a long run.
pub const MAX_TIMEOUT_SECS: i32 = 60;

/// The supervised program. One build, one target.
pub const DEFAULT_TARGET: &str = "/usr/local/libexec/procwrap-child";

/// Environment variable that substitutes the target at startup.
pub const TARGET_ENV: &str = "PROCWRAP_TARGET";

/// Immutable supervision parameters, validated before anything forks.
#[derive(Debug)]
pub struct SupervisionConfig {
    /// Already-open descriptor the report is written to.
    pub output_fd: i32,
    /// Wall-clock budget for the child, 1..=60.
    pub timeout_secs: i32,
    /// Signal delivered to the child when the budget expires.
    pub term_signal: Signal,
    /// Skip moving into our own process group.
    pub foreground: bool,
    /// Report the child's real wait status; when false, a timed-out run
    /// makes the supervisor itself exit 128+term_signal.
    pub preserve_child_status: bool,
    /// Resolved path of the program the child execs.
    pub target: CString,
}

/// Parse a strictly positive decimal integer: first char '1'..='9', all
/// ASCII digits, checked arithmetic. Returns None for anything else,
/// including values that overflow i32.
pub fn parse_positive_int(s: &str) -> Option<i32> {
    let bytes = s.as_bytes();
    match bytes.first() {
        Some(b'1'..=b'9') => {}
        _ => return None,
    }
    let mut value: i32 = 0;
    for &b in bytes {
        if !b.is_ascii_digit() {
            return None;
        }
        value = value
            .checked_mul(10)?
            .checked_add(i32::from(b - b'0'))?;
    }
    Some(value)
}

/* no-op descriptor-flags query; the cheapest "is this fd open" probe */
fn probe_descriptor(fd: i32) -> Result<()> {
    // SAFETY: fcntl(F_GETFD) reads a flag word; it cannot affect the fd.
    let ret = unsafe { libc::fcntl(fd, libc::F_GETFD) };
    if ret < 0 {
        let errno = std::io::Error::last_os_error().raw_os_error().unwrap_or(0);
        return Err(SupervisorError::BadDescriptor(fd, errno));
    }
    Ok(())
}

/* resolve the target program, env override first */
fn resolve_target() -> CString {
    let path = std::env::var(TARGET_ENV).unwrap_or_else(|_| String::from(DEFAULT_TARGET));
    /* a NUL in the override is unrepresentable as a path; fall back */
    CString::new(path).unwrap_or_else(|_| {
        eprintln!("procwrap: warning: {TARGET_ENV} contains NUL, using default target");
        CString::new(DEFAULT_TARGET).expect("default target contains no NUL")
    })
}

impl SupervisionConfig {
    /// Build and validate the configuration from the positional arguments
    /// (program name excluded). Fails before any process is created.
    pub fn from_args(args: &[String]) -> Result<Self> {
        if args.len() != 2 {
            return Err(SupervisorError::ArgCount(args.len()));
        }

        let output_fd = parse_positive_int(&args[0])
            .ok_or_else(|| SupervisorError::InvalidInteger(args[0].clone()))?;
        let timeout_secs = parse_positive_int(&args[1])
            .ok_or_else(|| SupervisorError::InvalidInteger(args[1].clone()))?;

        if timeout_secs > MAX_TIMEOUT_SECS {
            return Err(SupervisorError::TimeoutOutOfRange(timeout_secs));
        }

        probe_descriptor(output_fd)?;

        Ok(Self {
            output_fd,
            timeout_secs,
            term_signal: Signal::Kill,
            foreground: false,
            preserve_child_status: true,
            target: resolve_target(),
        })
    }
}
