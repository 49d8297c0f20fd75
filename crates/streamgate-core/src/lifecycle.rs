//! Process lifecycle: activation, signal handling, and child reaping.
//!
//! ```text
//! Inactive ──activate()──▶ Active ──SIGINT/SIGHUP/SIGTERM──▶ ShuttingDown
//!                             │
//!                             └── SIGCHLD: reap every finished child
//! ```
//!
//! The signal handler only ever stores `false` into [`ACTIVE`] or calls
//! `waitpid`; both are async-signal-safe. Nobody waits on the flag: the
//! acceptance engine polls it between `accept` calls.

use std::os::raw::c_int;
use std::sync::atomic::{AtomicBool, Ordering};

use nix::errno::Errno;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use tracing::{debug, error, info};

use streamgate_config::OptionRegistry;

use crate::privilege;

/// Process-wide "keep accepting connections" flag.
static ACTIVE: AtomicBool = AtomicBool::new(false);

/// Whether the process is active (activated and not yet told to stop).
pub fn is_active() -> bool {
    ACTIVE.load(Ordering::SeqCst)
}

/// Ask the acceptance engine to stop, exactly as a SIGTERM would.
pub fn request_shutdown() {
    ACTIVE.store(false, Ordering::SeqCst);
}

pub(crate) fn mark_active() {
    ACTIVE.store(true, Ordering::SeqCst);
}

/// What [`activate`] should do besides installing signal handlers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationSettings {
    /// User to switch to; `None`, empty, or `root` keeps the current user.
    pub username: Option<String>,
    /// Detach from the controlling terminal.
    pub daemonize: bool,
    /// Keep stdio open when daemonizing (a log file is configured).
    pub keep_stdio: bool,
}

impl ActivationSettings {
    /// Read `username`, `daemonize` and `logfile` from a parsed registry,
    /// treating unregistered options as unset.
    pub fn from_registry(config: &OptionRegistry) -> Self {
        let username = config.string("username").ok().filter(|u| !u.is_empty());
        let daemonize = config.boolean("daemonize").unwrap_or(false);
        let keep_stdio = config
            .string("logfile")
            .map(|f| !f.is_empty())
            .unwrap_or(false);
        Self {
            username,
            daemonize,
            keep_stdio,
        }
    }
}

/// Move the process from Inactive to Active.
///
/// In order: drop privileges, daemonize, mark the process active, install
/// signal handlers. Privilege and daemonization failures are logged and
/// otherwise ignored. The flag is raised before the handlers go in so that
/// a shutdown signal arriving right after installation is never overwritten.
pub fn activate(settings: &ActivationSettings) {
    if let Some(user) = settings.username.as_deref() {
        if let Err(e) = privilege::set_user(user) {
            error!(user, error = %e, "could not drop privileges");
        }
    }

    if settings.daemonize {
        if let Err(e) = privilege::daemonize(settings.keep_stdio) {
            error!(error = %e, "could not daemonize");
        }
    }

    mark_active();

    match install_signal_handlers() {
        Ok(reaper) => debug!(child_reaper = reaper, "signal handlers installed"),
        Err(e) => error!(error = %e, "failed to install signal handlers"),
    }
    info!(pid = std::process::id(), "process active");
}

/// Install the shared handler for SIGINT, SIGHUP, SIGTERM and SIGPIPE, and
/// for SIGCHLD unless something other than the default or ignore
/// disposition is already in place.
///
/// Returns whether the child reaper was installed.
#[allow(unsafe_code)]
pub fn install_signal_handlers() -> Result<bool, Errno> {
    let action = SigAction::new(
        SigHandler::Handler(handle_signal),
        SaFlags::empty(),
        SigSet::empty(),
    );

    for signal in [
        Signal::SIGINT,
        Signal::SIGHUP,
        Signal::SIGTERM,
        Signal::SIGPIPE,
    ] {
        // SAFETY: `handle_signal` only touches an atomic and calls waitpid.
        unsafe { sigaction(signal, &action) }?;
    }

    if !child_handler_unclaimed()? {
        return Ok(false);
    }
    // SAFETY: as above.
    unsafe { sigaction(Signal::SIGCHLD, &action) }?;
    Ok(true)
}

/// Whether SIGCHLD still has its default or ignore disposition.
#[allow(unsafe_code)]
fn child_handler_unclaimed() -> Result<bool, Errno> {
    // SAFETY: a null new-action makes this a pure query; `current` is a
    // plain C struct that sigaction fills in.
    let mut current: libc::sigaction = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::sigaction(libc::SIGCHLD, std::ptr::null(), &mut current) };
    if rc != 0 {
        return Err(Errno::last());
    }
    Ok(current.sa_sigaction == libc::SIG_DFL || current.sa_sigaction == libc::SIG_IGN)
}

extern "C" fn handle_signal(signum: c_int) {
    match Signal::try_from(signum) {
        Ok(Signal::SIGINT | Signal::SIGHUP | Signal::SIGTERM) => request_shutdown(),
        Ok(Signal::SIGCHLD) => {
            reap_children();
        }
        _ => {}
    }
}

/// Collect every child that has already exited, without blocking.
///
/// Retries on EINTR and stops once nothing more is immediately reapable
/// (or there are no children at all). Returns how many were reaped.
pub fn reap_children() -> usize {
    let mut reaped = 0;
    loop {
        match waitpid(None, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => break,
            Ok(_) => reaped += 1,
            Err(Errno::EINTR) => continue,
            Err(_) => break,
        }
    }
    reaped
}
