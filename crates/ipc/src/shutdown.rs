//! Cooperative cancellation for the supervisor and generator loops.
//!
//! A [`ShutdownToken`] is a shared flag polled at loop tops and after every
//! interrupted semaphore wait. Tokens built with
//! [`ShutdownToken::with_os_signals`] are also set by SIGINT and SIGTERM.
//! The handler is installed without `SA_RESTART`, so a blocked `sem_wait`
//! returns `EINTR` and the caller gets a chance to look at the flag.

use std::io;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, OnceLock};

use crate::error::IpcError;

/// Flag shared with the signal handler; created on first installation.
static OS_FLAG: OnceLock<Arc<AtomicBool>> = OnceLock::new();

/// Last signal number seen by the handler (0 = none).
static LAST_SIGNAL: AtomicI32 = AtomicI32::new(0);

#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    requested: Arc<AtomicBool>,
    os_signals: bool,
}

impl ShutdownToken {
    /// A token that is only cancelled programmatically.
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that is also cancelled by SIGINT or SIGTERM.
    ///
    /// Every call returns a token backed by the same process-wide flag.
    pub fn with_os_signals() -> Result<Self, IpcError> {
        let flag = OS_FLAG
            .get_or_init(|| Arc::new(AtomicBool::new(false)))
            .clone();
        install_handler(libc::SIGINT)?;
        install_handler(libc::SIGTERM)?;
        Ok(Self {
            requested: flag,
            os_signals: true,
        })
    }

    pub fn cancel(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Name of the OS signal that cancelled this token, if any.
    pub fn received_signal(&self) -> Option<&'static str> {
        if !self.os_signals {
            return None;
        }
        match LAST_SIGNAL.load(Ordering::SeqCst) {
            libc::SIGINT => Some("SIGINT"),
            libc::SIGTERM => Some("SIGTERM"),
            _ => None,
        }
    }
}

extern "C" fn on_signal(signum: libc::c_int) {
    // Only atomic stores here: anything else is not async-signal-safe.
    LAST_SIGNAL.store(signum, Ordering::SeqCst);
    if let Some(flag) = OS_FLAG.get() {
        flag.store(true, Ordering::SeqCst);
    }
}

fn install_handler(signum: libc::c_int) -> Result<(), IpcError> {
    // SAFETY: sigaction is zero-initialisable; we fill in handler and mask
    // before passing it to the kernel, and `on_signal` only touches atomics.
    let ret = unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
        action.sa_flags = 0;
        libc::sigemptyset(&mut action.sa_mask);
        libc::sigaction(signum, &action, ptr::null_mut())
    };

    if ret != 0 {
        return Err(IpcError::Signal(io::Error::last_os_error()));
    }
    Ok(())
}
