//! In-memory layout of the shared segment.
//!
//! Every process maps the same [`RingState`], so all types here are
//! `#[repr(C)]` and contain only plain integers and atomics.

use std::mem;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use tricolor_core::{RemovedEdge, Solution, VertexKey, MAX_SOLUTION_LEN};

use crate::error::IpcError;

/// Number of slots in the ring.
pub const CAPACITY: usize = 200;

/// "3COL" in little-endian.
pub const SEGMENT_MAGIC: u32 = u32::from_le_bytes(*b"3COL");

pub const LAYOUT_VERSION: u32 = 1;

pub const SIGNAL_RUNNING: u32 = 0;
pub const SIGNAL_STOP: u32 = 1;

/// Total size of the mapped segment in bytes.
pub const SEGMENT_SIZE: usize = mem::size_of::<RingState>();

// ── Header ──────────────────────────────────────────────────────────

/// Shared control block at the start of the segment.
///
/// `magic` is written last (release) by the creator; attachers must observe
/// it (acquire) before trusting any other field.
#[repr(C)]
pub struct RingHeader {
    pub magic: AtomicU32,
    pub version: AtomicU32,
    pub capacity: AtomicU32,
    pub max_solution_len: AtomicU32,
    /// 0 = running, 1 = stop. Written only by the supervisor.
    pub signal: AtomicU32,
    _pad: u32,
    /// Next slot the supervisor will read. Never wraps; index is `% CAPACITY`.
    pub read_cursor: AtomicU64,
    /// Next slot a generator will claim. Advanced only under the `write` mutex.
    pub write_cursor: AtomicU64,
}

impl RingHeader {
    /// Fill in a freshly truncated (all-zero) header.
    pub(crate) fn initialise(&self) {
        self.version.store(LAYOUT_VERSION, Ordering::Relaxed);
        self.capacity.store(CAPACITY as u32, Ordering::Relaxed);
        self.max_solution_len
            .store(MAX_SOLUTION_LEN as u32, Ordering::Relaxed);
        self.signal.store(SIGNAL_RUNNING, Ordering::Relaxed);
        self.read_cursor.store(0, Ordering::Relaxed);
        self.write_cursor.store(0, Ordering::Relaxed);
        self.magic.store(SEGMENT_MAGIC, Ordering::Release);
    }

    /// Check that the creator finished initialising with a matching layout.
    pub(crate) fn verify(&self, name: &str) -> Result<(), IpcError> {
        if self.magic.load(Ordering::Acquire) != SEGMENT_MAGIC {
            return Err(IpcError::Uninitialised(name.to_string()));
        }

        let expect = [
            ("version", self.version.load(Ordering::Relaxed), LAYOUT_VERSION),
            ("capacity", self.capacity.load(Ordering::Relaxed), CAPACITY as u32),
            (
                "max solution length",
                self.max_solution_len.load(Ordering::Relaxed),
                MAX_SOLUTION_LEN as u32,
            ),
        ];
        for (field, found, wanted) in expect {
            if found != wanted {
                return Err(IpcError::Layout(format!(
                    "{field} is {found} in '{name}', this build expects {wanted}"
                )));
            }
        }
        Ok(())
    }

    pub fn stop_requested(&self) -> bool {
        self.signal.load(Ordering::Acquire) == SIGNAL_STOP
    }
}

// ── Slots ───────────────────────────────────────────────────────────

/// A solution flattened into fixed arrays so it can live in shared memory.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRecord {
    pub length: u32,
    pub from: [VertexKey; MAX_SOLUTION_LEN],
    pub to: [VertexKey; MAX_SOLUTION_LEN],
}

impl SlotRecord {
    pub const EMPTY: SlotRecord = SlotRecord {
        length: 0,
        from: [0; MAX_SOLUTION_LEN],
        to: [0; MAX_SOLUTION_LEN],
    };

    /// Flatten a solution. Fails without side effects if it is too long.
    pub fn encode(solution: &Solution) -> Result<Self, IpcError> {
        if !solution.fits() {
            return Err(IpcError::Oversized(solution.len()));
        }

        let mut record = Self::EMPTY;
        for (i, edge) in solution.edges().iter().enumerate() {
            record.from[i] = edge.from;
            record.to[i] = edge.to;
        }
        record.length = solution.len() as u32;
        Ok(record)
    }

    pub fn decode(&self) -> Result<Solution, IpcError> {
        let len = self.length as usize;
        if len > MAX_SOLUTION_LEN {
            return Err(IpcError::Layout(format!(
                "slot claims {len} edges, at most {MAX_SOLUTION_LEN} fit"
            )));
        }
        Ok((0..len)
            .map(|i| RemovedEdge {
                from: self.from[i],
                to: self.to[i],
            })
            .collect())
    }
}

/// The whole segment.
#[repr(C)]
pub struct RingState {
    pub header: RingHeader,
    pub slots: [SlotRecord; CAPACITY],
}

/// Map a monotonically increasing cursor to its slot index.
#[inline]
pub fn slot_index(cursor: u64) -> usize {
    (cursor % CAPACITY as u64) as usize
}
