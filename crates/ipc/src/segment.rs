//! POSIX shared-memory segment mapped with `memmap2`.

use std::ffi::CString;
use std::fs::File;
use std::io;
use std::os::unix::io::FromRawFd;

use memmap2::{MmapMut, MmapOptions};
use tracing::{debug, warn};

use crate::error::IpcError;
use crate::semaphore::c_name;

/// Mapping plus the descriptor backing it; dropped together.
struct Mapping {
    map: MmapMut,
    _file: File,
}

/// A mapped shared-memory object.
///
/// Dropping the creator's segment unmaps it, closes the descriptor and
/// unlinks the name, in that order. Attached segments only unmap and close.
pub struct SharedSegment {
    mapping: Option<Mapping>,
    base: *mut u8,
    len: usize,
    name: String,
    c_name: CString,
    owner: bool,
}

// SAFETY: the mapping is process-shared memory; concurrent access to it is
// governed by the atomics in the header and the ring's semaphores.
unsafe impl Send for SharedSegment {}
unsafe impl Sync for SharedSegment {}

impl SharedSegment {
    /// Create a new zero-filled segment of `len` bytes. Fails with
    /// [`IpcError::Stale`] if the name is already taken.
    pub fn create(name: &str, mode: u32, len: usize) -> Result<Self, IpcError> {
        let c_name = c_name(name)?;
        // SAFETY: c_name is a valid NUL-terminated string.
        let fd = unsafe {
            libc::shm_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL | libc::O_RDWR,
                mode as libc::mode_t,
            )
        };
        if fd < 0 {
            return Err(IpcError::last_os("shm_open", name));
        }
        // SAFETY: shm_open succeeded, so fd is a fresh descriptor we own.
        let file = unsafe { File::from_raw_fd(fd) };

        let mapped = file
            .set_len(len as u64)
            .map_err(|source| IpcError::Os {
                op: "ftruncate",
                name: name.to_string(),
                source,
            })
            .and_then(|()| map(&file, name, len));

        let map = match mapped {
            Ok(map) => map,
            Err(e) => {
                // SAFETY: c_name is valid; we created the object just above.
                unsafe { libc::shm_unlink(c_name.as_ptr()) };
                return Err(e);
            }
        };

        debug!(name, len, "created shared segment");
        Ok(Self::new(map, file, name, c_name, len, true))
    }

    /// Attach to a segment created by another process.
    ///
    /// A segment that exists but has not been sized yet is reported as
    /// [`IpcError::Uninitialised`]; one of the wrong size as a layout mismatch.
    pub fn open(name: &str, len: usize) -> Result<Self, IpcError> {
        let c_name = c_name(name)?;
        // SAFETY: c_name is a valid NUL-terminated string.
        let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDWR, 0) };
        if fd < 0 {
            return Err(IpcError::last_os("shm_open", name));
        }
        // SAFETY: shm_open succeeded, so fd is a fresh descriptor we own.
        let file = unsafe { File::from_raw_fd(fd) };

        let actual = file
            .metadata()
            .map_err(|source| IpcError::Os {
                op: "fstat",
                name: name.to_string(),
                source,
            })?
            .len();
        if actual == 0 {
            return Err(IpcError::Uninitialised(name.to_string()));
        }
        if actual != len as u64 {
            return Err(IpcError::Layout(format!(
                "'{name}' is {actual} bytes, this build expects {len}"
            )));
        }

        let map = map(&file, name, len)?;
        debug!(name, len, "attached shared segment");
        Ok(Self::new(map, file, name, c_name, len, false))
    }

    fn new(mut map: MmapMut, file: File, name: &str, c_name: CString, len: usize, owner: bool) -> Self {
        let base = map.as_mut_ptr();
        Self {
            mapping: Some(Mapping { map, _file: file }),
            base,
            len,
            name: name.to_string(),
            c_name,
            owner,
        }
    }

    /// Remove a name left behind by a crashed owner. Returns whether it existed.
    pub fn unlink(name: &str) -> Result<bool, IpcError> {
        let c_name = c_name(name)?;
        // SAFETY: c_name is a valid NUL-terminated string.
        if unsafe { libc::shm_unlink(c_name.as_ptr()) } == 0 {
            return Ok(true);
        }
        match IpcError::last_os("shm_unlink", name) {
            IpcError::Missing(_) => Ok(false),
            other => Err(other),
        }
    }

    /// Start of the mapping. Valid for `len()` bytes while `self` lives.
    pub fn as_ptr(&self) -> *mut u8 {
        self.base
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_owner(&self) -> bool {
        self.owner
    }
}

fn map(file: &File, name: &str, len: usize) -> Result<MmapMut, IpcError> {
    // SAFETY: the object is shared on purpose; every access to the mapping
    // goes through atomics or is serialised by the ring's semaphores.
    unsafe { MmapOptions::new().len(len).map_mut(file) }.map_err(|source| IpcError::Os {
        op: "mmap",
        name: name.to_string(),
        source,
    })
}

impl Drop for SharedSegment {
    fn drop(&mut self) {
        // munmap + close before unlink
        drop(self.mapping.take());

        if self.owner {
            // SAFETY: c_name is a valid NUL-terminated string.
            if unsafe { libc::shm_unlink(self.c_name.as_ptr()) } != 0 {
                warn!(name = %self.name, error = %io::Error::last_os_error(), "shm_unlink failed");
            }
        }
    }
}
