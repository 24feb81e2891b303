/*
 * signal.rs
 *
 * The signals this program actually touches, plus thin sigaction/sigset
 * wrappers so the supervisor reads as a sequence of named steps instead
 * of a wall of unsafe.
 *
 * Local Signal enum over libc constants - no nix dependency.
 */

/* Signals with a role in supervision. Everything else is the child's business. */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Signal {
    /// Timer expiry path.
    Alrm = libc::SIGALRM,
    /// Ctrl-C at a terminal.
    Int = libc::SIGINT,
    /// Ctrl-\ at a terminal.
    Quit = libc::SIGQUIT,
    /// Terminal closed.
    Hup = libc::SIGHUP,
    /// Generic terminate.
    Term = libc::SIGTERM,
    /// Default termination signal sent to the child on timeout.
    Kill = libc::SIGKILL,
    /// Child exit notification; interrupts sigsuspend.
    Chld = libc::SIGCHLD,
    /// Relay channel: payload names a signal to forward to the child.
    Usr1 = libc::SIGUSR1,
    /// Job control, ignored so a background run never stops on tty reads.
    Ttin = libc::SIGTTIN,
    /// Job control, ignored so a background run never stops on tty writes.
    Ttou = libc::SIGTTOU,
}

impl Signal {
    #[inline]
    pub const fn as_raw(self) -> i32 {
        self as i32
    }

    /* convert from raw signal number */
    pub fn try_from_raw(num: i32) -> Option<Self> {
        match num {
            libc::SIGALRM => Some(Self::Alrm),
            libc::SIGINT => Some(Self::Int),
            libc::SIGQUIT => Some(Self::Quit),
            libc::SIGHUP => Some(Self::Hup),
            libc::SIGTERM => Some(Self::Term),
            libc::SIGKILL => Some(Self::Kill),
            libc::SIGCHLD => Some(Self::Chld),
            libc::SIGUSR1 => Some(Self::Usr1),
            libc::SIGTTIN => Some(Self::Ttin),
            libc::SIGTTOU => Some(Self::Ttou),
            _ => None,
        }
    }

    /* human-readable name for stderr diagnostics */
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Alrm => "SIGALRM",
            Self::Int => "SIGINT",
            Self::Quit => "SIGQUIT",
            Self::Hup => "SIGHUP",
            Self::Term => "SIGTERM",
            Self::Kill => "SIGKILL",
            Self::Chld => "SIGCHLD",
            Self::Usr1 => "SIGUSR1",
            Self::Ttin => "SIGTTIN",
            Self::Ttou => "SIGTTOU",
        }
    }
}

/// A plain signal handler: `extern "C" fn(signo)`.
pub type Handler = extern "C" fn(i32);

/// A three-argument handler installed with SA_SIGINFO.
pub type SigInfoHandler = extern "C" fn(i32, *mut libc::siginfo_t, *mut libc::c_void);

/// Install `handler` for `sig` with SA_RESTART and an empty handler mask
/// (concurrent invocations allowed). Returns false if sigaction failed.
pub fn install_handler(sig: i32, handler: Handler) -> bool {
    // SAFETY: sa is zeroed then fully initialized; handler is an extern "C" fn
    // with the signature sigaction expects for sa_handler. sigemptyset and
    // sigaction are given valid pointers. All ops share the invariant of
    // building one sigaction registration.
    #[allow(clippy::multiple_unsafe_ops_per_block)]
    unsafe {
        let mut sa: libc::sigaction = core::mem::zeroed();
        sa.sa_sigaction = handler as *const () as libc::sighandler_t;
        sa.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&raw mut sa.sa_mask);
        libc::sigaction(sig, &sa, core::ptr::null_mut()) == 0
    }
}

/// Install a SA_SIGINFO handler for `sig` (used for the relay channel,
/// which needs the sender-supplied sigval payload).
pub fn install_siginfo_handler(sig: i32, handler: SigInfoHandler) -> bool {
    // SAFETY: same shape as install_handler; SA_SIGINFO selects the
    // three-argument handler variant, and the fn signature matches.
    #[allow(clippy::multiple_unsafe_ops_per_block)]
    unsafe {
        let mut sa: libc::sigaction = core::mem::zeroed();
        sa.sa_sigaction = handler as *const () as libc::sighandler_t;
        sa.sa_flags = libc::SA_RESTART | libc::SA_SIGINFO;
        libc::sigemptyset(&raw mut sa.sa_mask);
        libc::sigaction(sig, &sa, core::ptr::null_mut()) == 0
    }
}

/// Set SIG_IGN for `sig`.
pub fn ignore(sig: i32) {
    // SAFETY: SIG_IGN is a valid disposition for any catchable signal.
    unsafe {
        libc::signal(sig, libc::SIG_IGN);
    }
}

/// Restore SIG_DFL for `sig`. exec does not reset ignored dispositions,
/// so the launcher calls this for the job-control signals before execv.
pub fn default_disposition(sig: i32) {
    // SAFETY: SIG_DFL is a valid disposition for any signal.
    unsafe {
        libc::signal(sig, libc::SIG_DFL);
    }
}

/// Remove `sig` from the calling process's blocked set. The mask is
/// inherited, so a blocked SIGALRM or SIGCHLD from the parent environment
/// would silently defeat supervision.
pub fn unblock(sig: i32) {
    // SAFETY: set is initialized by sigemptyset before use; sigprocmask with
    // SIG_UNBLOCK and a valid set pointer is safe. Ops share one invariant:
    // the set is built then applied.
    #[allow(clippy::multiple_unsafe_ops_per_block)]
    let ok = unsafe {
        let mut set: libc::sigset_t = core::mem::zeroed();
        libc::sigemptyset(&raw mut set);
        libc::sigaddset(&raw mut set, sig);
        libc::sigprocmask(libc::SIG_UNBLOCK, &set, core::ptr::null_mut()) == 0
    };
    if !ok {
        eprintln!("procwrap: warning: sigprocmask(SIG_UNBLOCK) failed");
    }
}

/// Atomically block every signal in `sigs`, returning the previously
/// active mask. The caller hands that mask back to [`suspend`] so the set
/// is unblocked only for the duration of the wait.
pub fn block_all(sigs: &[i32]) -> libc::sigset_t {
    // SAFETY: both sets are initialized by sigemptyset before use; sigaddset
    // only ever sees valid signal numbers from our fixed lists; sigprocmask
    // writes the old mask into old_set. Ops share one invariant: build the
    // set, then swap it in while capturing the previous mask.
    #[allow(clippy::multiple_unsafe_ops_per_block)]
    unsafe {
        let mut set: libc::sigset_t = core::mem::zeroed();
        let mut old_set: libc::sigset_t = core::mem::zeroed();
        libc::sigemptyset(&raw mut set);
        libc::sigemptyset(&raw mut old_set);
        for &sig in sigs {
            libc::sigaddset(&raw mut set, sig);
        }
        if libc::sigprocmask(libc::SIG_BLOCK, &set, &raw mut old_set) != 0 {
            eprintln!("procwrap: warning: sigprocmask(SIG_BLOCK) failed");
        }
        old_set
    }
}

/// Wait for any signal deliverable under `mask`. Returns when a handler
/// has run. This is the only blocking point in the whole program.
pub fn suspend(mask: &libc::sigset_t) {
    // SAFETY: mask was produced by block_all (a valid sigset_t). sigsuspend
    // always returns -1/EINTR; that is its success mode.
    unsafe {
        libc::sigsuspend(mask);
    }
}

/// Forward `sig` to `pid`. When the target is the whole group (pid == 0),
/// first set SIG_IGN on self so the group-directed signal cannot re-enter
/// the handler that called us.
pub fn send_sig(pid: libc::pid_t, sig: i32) -> i32 {
    if pid == 0 {
        ignore(sig);
    }
    // SAFETY: kill is safe with any pid/signal combination; errors are
    // reported through the return value.
    unsafe { libc::kill(pid, sig) }
}

/// Move the calling process into its own process group, so one signal to
/// the group reaches every descendant the child may spawn.
pub fn own_process_group() {
    // SAFETY: setpgid(0, 0) operates on the calling process only.
    if unsafe { libc::setpgid(0, 0) } != 0 {
        /* not fatal: supervision still works, group kills just narrow to the child */
        eprintln!("procwrap: warning: setpgid failed, staying in inherited group");
    }
}
