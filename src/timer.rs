/*
 * timer.rs
 *
 * Arm the deadline. POSIX per-process timer first (nanosecond API, though
 * we only need whole seconds); alarm(2) as the fallback.
 *
 * A timer that fails to arm must not fail the run - a late or coarse
 * timeout still bounds the child, no timeout does not. Everything in here
 * warns and degrades instead of erroring.
 */

use core::ptr;

/* one-shot itimerspec: no interval, fires once at `secs` from now */
#[inline]
pub const fn one_shot(secs: i32) -> libc::itimerspec {
    libc::itimerspec {
        it_interval: libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        },
        it_value: libc::timespec {
            tv_sec: secs as libc::time_t,
            tv_nsec: 0,
        },
    }
}

/// Arm the timeout: SIGALRM in `secs` seconds.
///
/// timer_create with a null sigevent delivers SIGALRM on expiry, same as
/// alarm(2) but armed with a timespec. If creating or arming fails we
/// warn (unless the kernel simply lacks POSIX timers) and fall back to
/// alarm(2) whole-second resolution.
pub fn arm(secs: i32, warn: bool) {
    let spec = one_shot(secs);
    let mut timer_id: libc::timer_t = ptr::null_mut();

    // SAFETY: a null sigevent selects SIGEV_SIGNAL/SIGALRM; timer_id is a
    // valid out-pointer. timer_settime receives the id just created and a
    // valid itimerspec. timer_delete only runs on the id that was created.
    // All ops share the invariant of managing the one timer id.
    #[allow(clippy::multiple_unsafe_ops_per_block)]
    unsafe {
        if libc::timer_create(libc::CLOCK_REALTIME, ptr::null_mut(), &raw mut timer_id) == 0 {
            if libc::timer_settime(timer_id, 0, &spec, ptr::null_mut()) == 0 {
                return;
            }
            if warn {
                eprintln!("procwrap: warning: timer_settime failed, falling back to alarm");
            }
            libc::timer_delete(timer_id);
        } else if warn {
            let errno = std::io::Error::last_os_error().raw_os_error().unwrap_or(0);
            if errno != libc::ENOSYS {
                eprintln!("procwrap: warning: timer_create failed (errno {errno}), falling back to alarm");
            }
        }

        /* whole-second fallback; the report still carries real elapsed time */
        libc::alarm(secs as libc::c_uint);
    }
}
