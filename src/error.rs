/*
 * error.rs
 *
 * Exit codes are part of the wire contract. The caller distinguishes
 * "bad invocation" (2) from "supervision broke" (1) from "report written" (0).
 * The 125/126/127 family belongs to the child's exec path, GNU style.
 *
 * Don't change them. The harness on the other side of the fd depends on it.
 */

use core::fmt;

/// Exit codes of the supervisor process itself (not the child's status,
/// which travels inside the report).
pub mod exit_codes {
    /// Report emitted, supervision complete.
    pub const OK: u8 = 0;
    /// Operational failure after setup: clock, rusage, or report write.
    pub const FAILURE: u8 = 1;
    /// Bad arguments, invalid descriptor, or fork failure - nothing was run.
    pub const USAGE: u8 = 2;
    /// Child-side exec failed for a reason other than the two below.
    pub const EXEC_FAILED: u8 = 125;
    /// Child-side: target found but could not be invoked (permissions).
    pub const CANNOT_INVOKE: u8 = 126;
    /// Child-side: target program not found.
    pub const NOT_FOUND: u8 = 127;
}

/* everything that can go wrong on the supervisor side */
#[derive(Debug)]
pub enum SupervisorError {
    /// Wrong argument count: expected exactly two positionals.
    ArgCount(usize),
    /// A positional was not a strictly positive decimal integer.
    InvalidInteger(String),
    /// Timeout outside the 1..=60 second range.
    TimeoutOutOfRange(i32),
    /// The output descriptor is not open (errno from fcntl).
    BadDescriptor(i32, i32),
    /// fork(2) failed (errno).
    Fork(i32),
    /// clock_gettime failed or the clock went backwards.
    Clock(&'static str),
    /// getrusage(2) failed (errno).
    Rusage(i32),
    /// A write of the report to the output descriptor failed (errno).
    ReportWrite(i32),
}

impl fmt::Display for SupervisorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArgCount(n) => {
                write!(f, "expected 2 arguments (output-fd timeout-secs), got {n}")
            }
            Self::InvalidInteger(s) => write!(f, "not a positive decimal integer: '{s}'"),
            Self::TimeoutOutOfRange(secs) => {
                write!(f, "timeout {secs}s out of range (1..=60)")
            }
            Self::BadDescriptor(fd, errno) => {
                write!(f, "output descriptor {fd} is not open: errno {errno}")
            }
            Self::Fork(errno) => write!(f, "fork failed: errno {errno}"),
            Self::Clock(what) => write!(f, "monotonic clock failure: {what}"),
            Self::Rusage(errno) => write!(f, "getrusage failed: errno {errno}"),
            Self::ReportWrite(errno) => write!(f, "report write failed: errno {errno}"),
        }
    }
}

impl SupervisorError {
    /* map errors to exit codes. 2 means "nothing ran", 1 means "child ran
     * but the report didn't make it" - the caller must tell these apart. */
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::ArgCount(_)
            | Self::InvalidInteger(_)
            | Self::TimeoutOutOfRange(_)
            | Self::BadDescriptor(_, _)
            | Self::Fork(_) => exit_codes::USAGE,
            Self::Clock(_) | Self::Rusage(_) | Self::ReportWrite(_) => exit_codes::FAILURE,
        }
    }
}

pub type Result<T> = core::result::Result<T, SupervisorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors_exit_2() {
        assert_eq!(SupervisorError::ArgCount(0).exit_code(), exit_codes::USAGE);
        assert_eq!(
            SupervisorError::InvalidInteger("x".into()).exit_code(),
            exit_codes::USAGE
        );
        assert_eq!(
            SupervisorError::TimeoutOutOfRange(61).exit_code(),
            exit_codes::USAGE
        );
        assert_eq!(
            SupervisorError::BadDescriptor(7, libc::EBADF).exit_code(),
            exit_codes::USAGE
        );
        assert_eq!(
            SupervisorError::Fork(libc::EAGAIN).exit_code(),
            exit_codes::USAGE
        );
    }

    #[test]
    fn test_operational_errors_exit_1() {
        assert_eq!(
            SupervisorError::Clock("backwards").exit_code(),
            exit_codes::FAILURE
        );
        assert_eq!(
            SupervisorError::Rusage(libc::EINVAL).exit_code(),
            exit_codes::FAILURE
        );
        assert_eq!(
            SupervisorError::ReportWrite(libc::EPIPE).exit_code(),
            exit_codes::FAILURE
        );
    }

    #[test]
    fn test_display_mentions_the_fd() {
        let msg = format!("{}", SupervisorError::BadDescriptor(42, libc::EBADF));
        assert!(msg.contains("42"), "message should name the descriptor");
    }
}
