/*
 * rusage.rs
 *
 * Resource accounting for the reaped child via getrusage(RUSAGE_CHILDREN).
 *
 * RUSAGE_CHILDREN only counts *waited-for* children, which is exactly the
 * guarantee we need: the snapshot is taken after the reap, so it covers the
 * one child (and whatever it waited for in turn), never the supervisor.
 */

use crate::error::{Result, SupervisorError};
use crate::time_math::timeval_ns;

/// The counters the report carries, units already converted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceUsage {
    /// CPU time spent in user mode, nanoseconds.
    pub user_ns: i64,
    /// CPU time spent in kernel mode, nanoseconds.
    pub kernel_ns: i64,
    /// Peak resident set size, kilobytes (as the kernel reports it).
    pub max_rss_kb: i64,
    /// Page faults that required I/O.
    pub major_faults: i64,
    /// Page faults serviced without I/O.
    pub minor_faults: i64,
    /// Block input operations.
    pub input_ops: i64,
    /// Block output operations.
    pub output_ops: i64,
    /// Voluntary context switches (waits).
    pub voluntary_switches: i64,
    /// Involuntary context switches (preemptions).
    pub involuntary_switches: i64,
}

impl ResourceUsage {
    /// Snapshot accumulated usage of terminated, waited-for children.
    ///
    /// # Errors
    /// `Rusage` with errno if the query fails; the caller aborts with an
    /// operational failure rather than reporting zeros it never measured.
    pub fn for_children() -> Result<Self> {
        // SAFETY: rusage is a plain C struct; zeroed is a valid initial
        // state and getrusage overwrites every field it defines.
        let mut raw: libc::rusage = unsafe { core::mem::zeroed() };
        // SAFETY: RUSAGE_CHILDREN is a valid who-argument; raw is a valid
        // out-pointer for the calling process.
        let ret = unsafe { libc::getrusage(libc::RUSAGE_CHILDREN, &raw mut raw) };
        if ret != 0 {
            let errno = std::io::Error::last_os_error().raw_os_error().unwrap_or(0);
            return Err(SupervisorError::Rusage(errno));
        }
        Ok(Self::from_raw(&raw))
    }

    /* unit conversion lives here so the report only sees finished numbers;
     * i64::from keeps this width-correct wherever c_long is 32-bit */
    fn from_raw(raw: &libc::rusage) -> Self {
        Self {
            user_ns: timeval_ns(raw.ru_utime),
            kernel_ns: timeval_ns(raw.ru_stime),
            max_rss_kb: i64::from(raw.ru_maxrss),
            major_faults: i64::from(raw.ru_majflt),
            minor_faults: i64::from(raw.ru_minflt),
            input_ops: i64::from(raw.ru_inblock),
            output_ops: i64::from(raw.ru_oublock),
            voluntary_switches: i64::from(raw.ru_nvcsw),
            involuntary_switches: i64::from(raw.ru_nivcsw),
        }
    }
}
