/*
 * time_math.rs
 *
 * Nanosecond arithmetic for the report, with explicit failure modes.
 *
 * Why not saturating_sub everywhere?
 * - saturating_sub(end, start) returns 0 when start > end, silently masking
 *   a backwards clock
 * - checked_sub surfaces the anomaly so the supervisor can refuse to report
 *   a fabricated elapsed time
 *
 * The timeval/timespec conversions widen to i64 first: a minute of
 * nanoseconds already exceeds i32.
 */

use crate::error::{Result, SupervisorError};

/*
 * Elapsed time in nanoseconds: end - start.
 *
 * Returns None if end < start (clock went backwards or arguments swapped).
 * Callers treat this as an operational error, never as "zero elapsed".
 */
#[inline]
pub const fn elapsed_ns(start_ns: i64, end_ns: i64) -> Option<i64> {
    if end_ns < start_ns {
        None
    } else {
        Some(end_ns - start_ns)
    }
}

/*
 * struct timespec -> nanoseconds, widening before multiplication.
 */
#[inline]
pub const fn timespec_ns(ts: libc::timespec) -> i64 {
    (ts.tv_sec as i64)
        .saturating_mul(1_000_000_000)
        .saturating_add(ts.tv_nsec as i64)
}

/*
 * struct timeval (seconds + microseconds, as rusage reports CPU time)
 * -> nanoseconds.
 */
#[inline]
pub const fn timeval_ns(tv: libc::timeval) -> i64 {
    (tv.tv_sec as i64)
        .saturating_mul(1_000_000_000)
        .saturating_add((tv.tv_usec as i64).saturating_mul(1_000))
}

/// Read CLOCK_MONOTONIC in nanoseconds.
///
/// # Errors
/// `Clock` if clock_gettime fails (effectively impossible on Linux, but the
/// report must never carry an invented timestamp).
pub fn monotonic_now_ns() -> Result<i64> {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: ts is a valid timespec for clock_gettime to fill in.
    let ret = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &raw mut ts) };
    if ret != 0 {
        return Err(SupervisorError::Clock("clock_gettime(CLOCK_MONOTONIC)"));
    }
    Ok(timespec_ns(ts))
}

/* -------------------------------------------------------------------------- */
/*                              kani proofs                                   */
/* -------------------------------------------------------------------------- */

#[cfg(kani)]
mod kani_proofs {
    use super::*;

    /*
     * verify elapsed_ns returns None exactly when the clock went backwards,
     * and the true difference otherwise. this is the anti-fabrication
     * contract the report emitter depends on.
     */
    #[kani::proof]
    fn verify_elapsed_ns_none_on_backwards() {
        let start: i64 = kani::any();
        let end: i64 = kani::any();

        let result = elapsed_ns(start, end);

        if end < start {
            kani::assert(result.is_none(), "backwards clock must be surfaced");
        } else {
            kani::assert(result.is_some(), "forward clock must produce a value");
            kani::assert(
                result.unwrap() == end - start,
                "elapsed must be the exact difference",
            );
        }
    }

    /*
     * verify elapsed_ns never returns a negative duration.
     */
    #[kani::proof]
    fn verify_elapsed_ns_nonnegative() {
        let start: i64 = kani::any();
        let end: i64 = kani::any();

        if let Some(d) = elapsed_ns(start, end) {
            kani::assert(d >= 0, "elapsed time is never negative");
        }
    }
}
