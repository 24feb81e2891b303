/*
 * report.rs
 *
 * The one JSON record this program exists to produce.
 *
 * Hand-rolled serialization on purpose: the schema is fixed, field order is
 * part of the contract, and every value is a bool, an integer, or one of
 * four literals owned by StatusKind. Nothing here needs escaping - keep it
 * that way if the schema ever grows (see StatusKind).
 *
 * One write per field, like the original dprintf burst: a consumer watching
 * the descriptor never sees a half-written field, and the first failed
 * write aborts the run instead of silently truncating the record.
 */

use crate::error::{Result, SupervisorError};
use crate::process::DecodedStatus;
use crate::rusage::ResourceUsage;

/// Everything the caller learns about the run. Constructed once after the
/// reap, written once, then the process exits.
#[derive(Debug)]
pub struct UsageReport {
    pub timed_out: bool,
    pub status: DecodedStatus,
    pub real_ns: i64,
    pub usage: ResourceUsage,
}

/* write the whole buffer to fd, retrying on EINTR and partial writes */
fn put(fd: i32, buf: &[u8]) -> Result<()> {
    let mut off = 0;
    while off < buf.len() {
        // SAFETY: buf[off..] is a valid sub-slice of a live buffer; fd was
        // validated open at startup. write reports errors via its return.
        let n = unsafe { libc::write(fd, buf[off..].as_ptr().cast(), buf.len() - off) };
        if n < 0 {
            let errno = std::io::Error::last_os_error().raw_os_error().unwrap_or(0);
            if errno == libc::EINTR {
                continue;
            }
            return Err(SupervisorError::ReportWrite(errno));
        }
        off += n as usize;
    }
    Ok(())
}

impl UsageReport {
    /// Serialize to `fd`: one flat object, fields in contract order, one
    /// trailing newline. Any write failure is fatal to the whole run -
    /// a partial record must never read as success downstream.
    pub fn emit(&self, fd: i32) -> Result<()> {
        let u = &self.usage;
        put(fd, b"{")?;
        put(
            fd,
            format!(
                "\"timed_out\":{},",
                if self.timed_out { "true" } else { "false" }
            )
            .as_bytes(),
        )?;
        put(
            fd,
            format!("\"status_type\":\"{}\",", self.status.kind.as_str()).as_bytes(),
        )?;
        put(fd, format!("\"status_value\":{},", self.status.value).as_bytes())?;
        put(fd, format!("\"user\":{},", u.user_ns).as_bytes())?;
        put(fd, format!("\"kernel\":{},", u.kernel_ns).as_bytes())?;
        put(fd, format!("\"real\":{},", self.real_ns).as_bytes())?;
        put(fd, format!("\"max_mem\":{},", u.max_rss_kb).as_bytes())?;
        put(fd, format!("\"major_page_faults\":{},", u.major_faults).as_bytes())?;
        put(fd, format!("\"minor_page_faults\":{},", u.minor_faults).as_bytes())?;
        put(fd, format!("\"input_ops\":{},", u.input_ops).as_bytes())?;
        put(fd, format!("\"output_ops\":{},", u.output_ops).as_bytes())?;
        put(fd, format!("\"waits\":{},", u.voluntary_switches).as_bytes())?;
        /* last field: no trailing comma */
        put(fd, format!("\"preemptions\":{}", u.involuntary_switches).as_bytes())?;
        put(fd, b"}\n")?;
        Ok(())
    }
}
