//! Named POSIX semaphores with owner/attacher lifecycle.
//!
//! The creator of a semaphore is its owner: dropping the owner's handle
//! closes *and* unlinks the name. Handles obtained with
//! [`NamedSemaphore::open`] only close.

use std::ffi::CString;
use std::io;
use std::ptr::NonNull;

use tracing::warn;

use crate::error::IpcError;
use crate::shutdown::ShutdownToken;

/// Outcome of a blocking wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    /// One unit was taken and must eventually be posted back by someone.
    Acquired,
    /// The wait was interrupted and the shutdown token is set. Nothing is held.
    Cancelled,
}

pub struct NamedSemaphore {
    sem: NonNull<libc::sem_t>,
    name: String,
    c_name: CString,
    owner: bool,
}

// SAFETY: POSIX semaphores are designed for concurrent use from any thread
// (and any process); the handle is only closed in `Drop`.
unsafe impl Send for NamedSemaphore {}
unsafe impl Sync for NamedSemaphore {}

impl NamedSemaphore {
    /// Create a new semaphore with `value` initial units. Fails with
    /// [`IpcError::Stale`] if the name is already taken.
    pub fn create(name: &str, mode: u32, value: u32) -> Result<Self, IpcError> {
        let c_name = c_name(name)?;
        // SAFETY: c_name is a valid NUL-terminated string; the variadic
        // arguments are the mode and initial value required by O_CREAT.
        let sem = unsafe {
            libc::sem_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL,
                mode as libc::c_uint,
                value as libc::c_uint,
            )
        };
        Self::from_raw(sem, name, c_name, true)
    }

    /// Open an existing semaphore created by another process.
    pub fn open(name: &str) -> Result<Self, IpcError> {
        let c_name = c_name(name)?;
        // SAFETY: c_name is a valid NUL-terminated string.
        let sem = unsafe { libc::sem_open(c_name.as_ptr(), 0) };
        Self::from_raw(sem, name, c_name, false)
    }

    fn from_raw(
        sem: *mut libc::sem_t,
        name: &str,
        c_name: CString,
        owner: bool,
    ) -> Result<Self, IpcError> {
        if sem == libc::SEM_FAILED {
            return Err(IpcError::last_os("sem_open", name));
        }
        let sem = NonNull::new(sem).ok_or_else(|| IpcError::last_os("sem_open", name))?;
        Ok(Self {
            sem,
            name: name.to_string(),
            c_name,
            owner,
        })
    }

    /// Remove a name left behind by a crashed owner. Returns whether it existed.
    pub fn unlink(name: &str) -> Result<bool, IpcError> {
        let c_name = c_name(name)?;
        // SAFETY: c_name is a valid NUL-terminated string.
        if unsafe { libc::sem_unlink(c_name.as_ptr()) } == 0 {
            return Ok(true);
        }
        match IpcError::last_os("sem_unlink", name) {
            IpcError::Missing(_) => Ok(false),
            other => Err(other),
        }
    }

    /// Block until a unit is available.
    ///
    /// Signal interruptions are retried unless `token` has been cancelled,
    /// in which case the wait gives up without holding anything.
    pub fn wait(&self, token: &ShutdownToken) -> Result<Acquire, IpcError> {
        loop {
            // SAFETY: self.sem is a live handle returned by sem_open.
            if unsafe { libc::sem_wait(self.sem.as_ptr()) } == 0 {
                return Ok(Acquire::Acquired);
            }

            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(self.os_error("sem_wait", err));
            }
            if token.is_cancelled() {
                return Ok(Acquire::Cancelled);
            }
        }
    }

    /// Take a unit if one is available right now.
    pub fn try_wait(&self) -> Result<bool, IpcError> {
        loop {
            // SAFETY: self.sem is a live handle returned by sem_open.
            if unsafe { libc::sem_trywait(self.sem.as_ptr()) } == 0 {
                return Ok(true);
            }

            let err = io::Error::last_os_error();
            match err.kind() {
                io::ErrorKind::WouldBlock => return Ok(false),
                io::ErrorKind::Interrupted => continue,
                _ => return Err(self.os_error("sem_trywait", err)),
            }
        }
    }

    pub fn post(&self) -> Result<(), IpcError> {
        // SAFETY: self.sem is a live handle returned by sem_open.
        if unsafe { libc::sem_post(self.sem.as_ptr()) } != 0 {
            return Err(self.os_error("sem_post", io::Error::last_os_error()));
        }
        Ok(())
    }

    /// Current number of available units.
    pub fn value(&self) -> Result<i32, IpcError> {
        let mut value: libc::c_int = 0;
        // SAFETY: self.sem is live and value is a valid out-pointer.
        if unsafe { libc::sem_getvalue(self.sem.as_ptr(), &mut value) } != 0 {
            return Err(self.os_error("sem_getvalue", io::Error::last_os_error()));
        }
        Ok(value)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_owner(&self) -> bool {
        self.owner
    }

    fn os_error(&self, op: &'static str, source: io::Error) -> IpcError {
        IpcError::Os {
            op,
            name: self.name.clone(),
            source,
        }
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        // SAFETY: the handle is live until here and never used again.
        if unsafe { libc::sem_close(self.sem.as_ptr()) } != 0 {
            warn!(name = %self.name, error = %io::Error::last_os_error(), "sem_close failed");
        }
        if self.owner {
            // SAFETY: c_name is a valid NUL-terminated string.
            if unsafe { libc::sem_unlink(self.c_name.as_ptr()) } != 0 {
                warn!(name = %self.name, error = %io::Error::last_os_error(), "sem_unlink failed");
            }
        }
    }
}

pub(crate) fn c_name(name: &str) -> Result<CString, IpcError> {
    if !name.starts_with('/') || name[1..].contains('/') {
        return Err(IpcError::InvalidName(name.to_string()));
    }
    CString::new(name).map_err(|_| IpcError::InvalidName(name.to_string()))
}
