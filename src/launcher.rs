/*
 * launcher.rs
 *
 * The child between fork and exec. Three jobs, in order: stop ignoring the
 * job-control signals (exec does not reset SIG_IGN), drop the report
 * descriptor (the target must not be able to write into the report), exec
 * the fixed target.
 *
 * The supervisor is single-threaded at fork time, so the forked image is
 * consistent; the diagnostic on the failure path uses stderr the same way
 * the parent does, then _exits without touching atexit state.
 */

use std::ffi::CStr;

use crate::error::exit_codes;
use crate::signal;

/* errno -> the exit status the supervisor will report for this child */
fn exec_failure_code(errno: i32) -> i32 {
    match errno {
        libc::ENOENT => i32::from(exit_codes::NOT_FOUND),
        libc::EACCES | libc::EPERM => i32::from(exit_codes::CANNOT_INVOKE),
        _ => i32::from(exit_codes::EXEC_FAILED),
    }
}

/// Replace this process with the target program. Never returns: either
/// execv succeeds or the child _exits with a status that tells the
/// supervisor's report apart "not found" / "cannot invoke" / other.
pub fn run(target: &CStr, report_fd: i32) -> ! {
    /* we inherited SIG_IGN for these from the supervisor's setup */
    signal::default_disposition(libc::SIGTTIN);
    signal::default_disposition(libc::SIGTTOU);

    // SAFETY: report_fd is the descriptor the supervisor validated at
    // startup; closing it in the child only affects the child.
    unsafe {
        libc::close(report_fd);
    }

    let argv: [*const libc::c_char; 2] = [target.as_ptr(), core::ptr::null()];
    // SAFETY: target is a NUL-terminated string outliving the call; argv is
    // NUL-terminated and its pointers stay valid through execv.
    unsafe {
        libc::execv(target.as_ptr(), argv.as_ptr());
    }

    /* only reached on failure */
    let errno = std::io::Error::last_os_error().raw_os_error().unwrap_or(0);
    eprintln!(
        "procwrap: exec {} failed: errno {errno}",
        target.to_string_lossy()
    );
    // SAFETY: _exit is async-signal-safe and skips atexit/stdio teardown,
    // which belong to the supervisor image we forked from.
    unsafe {
        libc::_exit(exec_failure_code(errno));
    }
}
