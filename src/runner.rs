/*
 * runner.rs
 *
 * The supervisor. All the tricky bits live here.
 *
 * The race this module exists to kill: a signal arriving between "is the
 * child done?" and "go to sleep until something happens". Plain poll+sleep
 * loses that signal and sleeps through a dead child; worse, a handler
 * firing after waitpid() reaps could kill a recycled pid. The fix is the
 * classic mask protocol: block the whole cleanup set, check with WNOHANG,
 * then sigsuspend() with the pre-block mask - the set is unblocked only
 * inside the sleep, atomically. Nothing slips through, nothing fires late.
 *
 * Ordering is load-bearing everywhere else too:
 *   - handlers are installed before fork, so a signal caused by the child
 *     cannot arrive unroutable
 *   - SIGALRM is explicitly unblocked before the timer is armed, because
 *     the inherited mask may block it
 *   - the child pid is published to a write-once atomic the instant fork
 *     returns; handlers deliver straight to that pid, never to the group,
 *     so a handler cannot re-trigger itself
 *
 * Handler state is a handful of single-word atomics (handlers cannot take
 * parameters). Each cell has one writer and one reader; no locks, no
 * ordering subtleties beyond SeqCst.
 */

use core::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use crate::config::SupervisionConfig;
use crate::error::{Result, SupervisorError};
use crate::launcher;
use crate::process::{self, DecodedStatus, Fork};
use crate::report::UsageReport;
use crate::rusage::ResourceUsage;
use crate::signal;
use crate::time_math::{elapsed_ns, monotonic_now_ns};
use crate::timer;

/* ------------------------- supervision context --------------------------- */

/* Child pid. 0 = not forked yet. Written once by supervise() the moment
 * fork returns; handlers only read. */
static CHILD_PID: AtomicI32 = AtomicI32::new(0);

/* Set once by the SIGALRM path, read after the reap. Never reset. */
static TIMED_OUT: AtomicBool = AtomicBool::new(false);

/* The configured termination signal, mirrored where the handler can see it. */
static TERM_SIGNAL: AtomicI32 = AtomicI32::new(libc::SIGKILL);

/* Handler-to-loop event cells, consumed (swapped to empty) by next_event.
 * 0 / false = empty. */
static PENDING_TIMEOUT: AtomicBool = AtomicBool::new(false);
static PENDING_INTERRUPT: AtomicI32 = AtomicI32::new(0);
static PENDING_RELAY: AtomicI32 = AtomicI32::new(0);

/* ------------------------------ handlers --------------------------------- */

/// What woke the reap loop. The handlers translate OS signals into these;
/// the loop is ordinary sequential control flow over the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The wall-clock budget expired (SIGALRM path).
    TimerExpired,
    /// An external termination-family signal was forwarded to the child.
    ExternalInterrupt(i32),
    /// The relay channel forwarded this signal number to the child.
    RelaySignal(i32),
    /// waitpid produced a status; supervision is over.
    ChildExited(DecodedStatus),
}

/* SIGALRM / SIGINT / SIGQUIT / SIGHUP / SIGTERM / term_signal.
 * Alarm remaps to the termination signal and raises the timed-out flag;
 * everything is delivered directly to the child's pid. Before a child
 * exists there is nothing to protect: exit the shell way, 128+sig. */
extern "C" fn on_termination_signal(signo: i32) {
    let mut deliver = signo;
    if signo == libc::SIGALRM {
        TIMED_OUT.store(true, Ordering::SeqCst);
        PENDING_TIMEOUT.store(true, Ordering::SeqCst);
        deliver = TERM_SIGNAL.load(Ordering::SeqCst);
    } else {
        PENDING_INTERRUPT.store(signo, Ordering::SeqCst);
    }

    let pid = CHILD_PID.load(Ordering::SeqCst);
    if pid != 0 {
        let _ = signal::send_sig(pid, deliver);
    } else {
        // SAFETY: _exit is async-signal-safe and the only sane way out of a
        // handler with no child to supervise.
        unsafe { libc::_exit(128 + deliver) };
    }
}

/* SIGUSR1 with SA_SIGINFO: the sigval payload names a signal to forward.
 * The caller never learns the child's pid; we are the address book. */
extern "C" fn on_relay_signal(
    _signo: i32,
    info: *mut libc::siginfo_t,
    _context: *mut libc::c_void,
) {
    if info.is_null() {
        return;
    }
    // SAFETY: the kernel passes a valid siginfo_t for SA_SIGINFO handlers;
    // si_value is defined for sigqueue senders.
    let payload = unsafe { (*info).si_value() };
    /* sigval is a union; sigqueue's int payload sits in the low bits */
    #[allow(clippy::cast_possible_truncation)]
    let target = payload.sival_ptr as usize as i32;

    let pid = CHILD_PID.load(Ordering::SeqCst);
    if pid != 0 && target > 0 {
        // SAFETY: kill is async-signal-safe; a bogus signal number is an
        // EINVAL we deliberately swallow (the caller owns the payload).
        unsafe { libc::kill(pid, target) };
        PENDING_RELAY.store(target, Ordering::SeqCst);
    }
}

/* Exists so sigsuspend() is interrupted promptly when the child exits.
 * The reap itself happens in the loop. */
extern "C" fn on_child_exit(_signo: i32) {}

/* -------------------------------- setup ---------------------------------- */

const TERMINATION_SET: [i32; 5] = [
    libc::SIGALRM,
    libc::SIGINT,
    libc::SIGQUIT,
    libc::SIGHUP,
    libc::SIGTERM,
];

fn install_termination_handlers(term_sig: i32) {
    let mut ok = true;
    for sig in TERMINATION_SET {
        ok &= signal::install_handler(sig, on_termination_signal);
    }
    /* the configured signal too, unless it is one of the uncatchable pair -
     * those are delivery-only */
    if term_sig != libc::SIGKILL && term_sig != libc::SIGSTOP {
        ok &= signal::install_handler(term_sig, on_termination_signal);
    }
    if !ok {
        /* best effort: refusing to run would drop timeout enforcement entirely */
        eprintln!("procwrap: warning: signal handler installation incomplete");
    }
}

fn install_child_exit_handler() {
    if !signal::install_handler(libc::SIGCHLD, on_child_exit) {
        eprintln!("procwrap: warning: SIGCHLD handler installation failed");
    }
    /* the mask is inherited; a blocked SIGCHLD would let sigsuspend sleep
     * through the child's exit */
    signal::unblock(libc::SIGCHLD);
}

/* ------------------------------ reap loop -------------------------------- */

/// Produce the next supervision event.
///
/// Protocol (the crux, do not reorder): the caller has the full cleanup
/// set blocked. Check WNOHANG first; consume any pending handler event;
/// only then sigsuspend with the pre-block mask, which unblocks the set
/// exactly for the duration of the sleep. A signal landing anywhere in
/// between stays queued until the suspend - never lost, never able to
/// race the reap.
fn next_event(pid: libc::pid_t, suspend_mask: &libc::sigset_t) -> Event {
    loop {
        match process::try_wait(pid) {
            Ok(Some(status)) => return Event::ChildExited(status.decode()),
            Ok(None) => {}
            Err(errno) => {
                /* should not happen under POSIX; report unknown, don't crash */
                eprintln!("procwrap: warning: waitpid failed: errno {errno}");
                return Event::ChildExited(DecodedStatus::unknown());
            }
        }

        if PENDING_TIMEOUT.swap(false, Ordering::SeqCst) {
            return Event::TimerExpired;
        }
        let relayed = PENDING_RELAY.swap(0, Ordering::SeqCst);
        if relayed != 0 {
            return Event::RelaySignal(relayed);
        }
        let interrupt = PENDING_INTERRUPT.swap(0, Ordering::SeqCst);
        if interrupt != 0 {
            return Event::ExternalInterrupt(interrupt);
        }

        signal::suspend(suspend_mask);
    }
}

/* loop until the child is reaped; delivery already happened in the
 * handlers, so the non-exit events need no further action here */
fn reap(pid: libc::pid_t, suspend_mask: &libc::sigset_t) -> DecodedStatus {
    loop {
        match next_event(pid, suspend_mask) {
            Event::ChildExited(status) => return status,
            Event::TimerExpired | Event::ExternalInterrupt(_) | Event::RelaySignal(_) => {}
        }
    }
}

/* ------------------------------ supervisor ------------------------------- */

/// Run the configured child once under supervision and return the report.
///
/// One call per process lifetime: the supervision context is write-once.
///
/// # Errors
/// Fork failure, clock failure, or rusage failure. Report *emission* is the
/// caller's step - this function only measures.
pub fn supervise(config: &SupervisionConfig) -> Result<UsageReport> {
    let term_sig = config.term_signal.as_raw();
    TERM_SIGNAL.store(term_sig, Ordering::SeqCst);

    /* own group first: one group signal reaches every descendant the child
     * spawns, without foreground/background propagation puzzles */
    if !config.foreground {
        signal::own_process_group();
    }

    /* handlers fully installed before fork, so no signal caused by the
     * child can arrive unrouted */
    install_termination_handlers(term_sig);
    signal::ignore(libc::SIGTTIN); /* don't stop if a background child needs the tty */
    signal::ignore(libc::SIGTTOU);
    install_child_exit_handler();

    let start_ns = monotonic_now_ns()?;

    let pid = match process::fork()? {
        Fork::Child => launcher::run(&config.target, config.output_fd),
        Fork::Parent(pid) => pid,
    };
    /* publish for the handlers: single write, read-only ever after */
    CHILD_PID.store(pid, Ordering::SeqCst);

    /* the timer delivers SIGALRM; the inherited mask must not eat it */
    signal::unblock(libc::SIGALRM);

    if !signal::install_siginfo_handler(libc::SIGUSR1, on_relay_signal) {
        eprintln!("procwrap: warning: relay handler installation failed");
    }

    timer::arm(config.timeout_secs, true);

    /* Block the full cleanup set, capturing the previous mask for the
     * suspend window. From here on no handler fires outside sigsuspend:
     * we can never kill a pid we have already reaped. */
    let suspend_mask = signal::block_all(&[
        libc::SIGALRM,
        libc::SIGINT,
        libc::SIGQUIT,
        libc::SIGHUP,
        libc::SIGTERM,
        term_sig,
        libc::SIGCHLD,
    ]);

    let status = reap(pid, &suspend_mask);

    let end_ns = monotonic_now_ns()?;
    let real_ns = elapsed_ns(start_ns, end_ns)
        .ok_or(SupervisorError::Clock("monotonic clock went backwards"))?;

    /* only terminated, waited-for children - never ourselves */
    let usage = ResourceUsage::for_children()?;

    Ok(UsageReport {
        timed_out: TIMED_OUT.load(Ordering::SeqCst),
        status,
        real_ns,
        usage,
    })
}
