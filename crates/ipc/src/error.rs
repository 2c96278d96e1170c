use std::io;

use thiserror::Error;
use tricolor_core::MAX_SOLUTION_LEN;

/// Errors raised while creating, attaching to or using the shared ring.
#[derive(Debug, Error)]
pub enum IpcError {
    #[error("{op} '{name}' failed: {source}")]
    Os {
        op: &'static str,
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("'{0}' already exists; a previous supervisor did not clean up (rerun with --reclaim)")]
    Stale(String),

    #[error("'{0}' does not exist; is the supervisor running?")]
    Missing(String),

    #[error("segment '{0}' has not been initialised by the supervisor yet")]
    Uninitialised(String),

    #[error("segment layout mismatch: {0}")]
    Layout(String),

    #[error("solution with {0} edges does not fit a slot (max {max})", max = MAX_SOLUTION_LEN)]
    Oversized(usize),

    #[error("invalid object name '{0}'")]
    InvalidName(String),

    #[error("installing signal handler failed: {0}")]
    Signal(#[source] io::Error),
}

impl IpcError {
    /// Wrap `errno` after a failed call on the named object, folding the
    /// common "already exists" and "not found" cases into their own variants.
    pub(crate) fn last_os(op: &'static str, name: &str) -> Self {
        let source = io::Error::last_os_error();
        match source.raw_os_error() {
            Some(libc::EEXIST) => IpcError::Stale(name.to_string()),
            Some(libc::ENOENT) => IpcError::Missing(name.to_string()),
            _ => IpcError::Os {
                op,
                name: name.to_string(),
                source,
            },
        }
    }
}
