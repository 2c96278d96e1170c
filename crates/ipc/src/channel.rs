//! The solution channel: shared ring + `free`/`used`/`write` semaphores.
//!
//! Producers (generators) call [`SolutionChannel::publish`]; the single
//! consumer (supervisor) calls [`SolutionChannel::recv`].
//!
//! # Producer protocol
//!
//! 1. Encode the solution. Oversized candidates fail here, before any
//!    semaphore is touched.
//! 2. Acquire `write`, then `free`. Slot claims are serialised with the
//!    cursor advance: a producer only learns its slot index once it is
//!    alone in the critical section, so no two producers share a slot.
//! 3. Re-check the stop flag, copy the record into
//!    `slots[write_cursor % CAPACITY]` and advance `write_cursor`.
//! 4. Post `write`, then post `used`.
//!
//! Every early exit after step 2 posts back what it took.

use std::ptr;
use std::sync::atomic::Ordering;

use tracing::{debug, info, warn};
use tricolor_core::config::IpcNames;
use tricolor_core::Solution;

use crate::error::IpcError;
use crate::layout::{slot_index, RingHeader, RingState, SlotRecord, CAPACITY, SEGMENT_SIZE, SIGNAL_STOP};
use crate::segment::SharedSegment;
use crate::semaphore::{Acquire, NamedSemaphore};
use crate::shutdown::ShutdownToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Created the objects; unlinks them on drop.
    Owner,
    /// Opened existing objects; only detaches on drop.
    Attached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publish {
    /// The solution was written at this cursor.
    Published { cursor: u64 },
    /// The supervisor had already set the stop flag; nothing was written.
    Stopped,
    /// The local shutdown token fired while waiting; nothing was written.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    Entry { cursor: u64, solution: Solution },
    /// The local shutdown token fired while waiting for an entry.
    Cancelled,
}

/// Snapshot of the three semaphore counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemaphoreValues {
    pub free: i32,
    pub used: i32,
    pub write: i32,
}

/// Field order is drop order: segment first, then `free`, `used`, `write`.
pub struct SolutionChannel {
    segment: SharedSegment,
    free: NamedSemaphore,
    used: NamedSemaphore,
    write: NamedSemaphore,
    role: Role,
}

impl SolutionChannel {
    /// Create and initialise every object. Only the supervisor does this.
    ///
    /// With `reclaim`, names left over from a crashed run are unlinked first;
    /// otherwise they make creation fail with [`IpcError::Stale`].
    pub fn create(names: &IpcNames, mode: u32, reclaim: bool) -> Result<Self, IpcError> {
        if reclaim {
            Self::reclaim(names)?;
        }

        // Each guard cleans up after itself if a later step fails.
        let segment = SharedSegment::create(&names.segment, mode, SEGMENT_SIZE)?;
        header_of(&segment).initialise();

        let free = NamedSemaphore::create(&names.free, mode, CAPACITY as u32)?;
        let used = NamedSemaphore::create(&names.used, mode, 0)?;
        let write = NamedSemaphore::create(&names.write, mode, 1)?;

        info!(segment = %names.segment, capacity = CAPACITY, "created solution channel");
        Ok(Self {
            segment,
            free,
            used,
            write,
            role: Role::Owner,
        })
    }

    /// Attach to objects created by a running supervisor.
    pub fn attach(names: &IpcNames) -> Result<Self, IpcError> {
        let segment = SharedSegment::open(&names.segment, SEGMENT_SIZE)?;
        header_of(&segment).verify(&names.segment)?;

        let free = NamedSemaphore::open(&names.free)?;
        let used = NamedSemaphore::open(&names.used)?;
        let write = NamedSemaphore::open(&names.write)?;

        debug!(segment = %names.segment, "attached to solution channel");
        Ok(Self {
            segment,
            free,
            used,
            write,
            role: Role::Attached,
        })
    }

    fn reclaim(names: &IpcNames) -> Result<(), IpcError> {
        if SharedSegment::unlink(&names.segment)? {
            warn!(name = %names.segment, "reclaimed stale segment");
        }
        for name in [&names.free, &names.used, &names.write] {
            if NamedSemaphore::unlink(name)? {
                warn!(name = %name, "reclaimed stale semaphore");
            }
        }
        Ok(())
    }

    // ── Producer side ───────────────────────────────────────────────

    /// Publish one solution into the next free slot.
    ///
    /// Blocks while another producer is in the critical section or the ring
    /// is full. Returns [`IpcError::Oversized`] without blocking if the
    /// solution does not fit a slot.
    pub fn publish(&self, solution: &Solution, token: &ShutdownToken) -> Result<Publish, IpcError> {
        let record = SlotRecord::encode(solution)?;

        if self.write.wait(token)? == Acquire::Cancelled {
            return Ok(Publish::Cancelled);
        }

        match self.free.wait(token) {
            Ok(Acquire::Acquired) => {}
            Ok(Acquire::Cancelled) => {
                self.write.post()?;
                return Ok(Publish::Cancelled);
            }
            Err(e) => {
                if let Err(post) = self.write.post() {
                    warn!(error = %post, "releasing write mutex after failed wait");
                }
                return Err(e);
            }
        }

        if self.header().stop_requested() {
            // Hand the unit on so the next blocked producer wakes up too.
            let handed_on = self.free.post();
            self.release_write(handed_on)?;
            return Ok(Publish::Stopped);
        }

        let header = self.header();
        let cursor = header.write_cursor.load(Ordering::Acquire);
        // SAFETY: we hold `write`, so no other producer touches this cursor,
        // and we hold a `free` unit, so the consumer has vacated this slot.
        unsafe { ptr::write(self.slot_ptr(cursor), record) };
        header.write_cursor.store(cursor + 1, Ordering::Release);

        self.write.post()?;
        self.used.post()?;
        Ok(Publish::Published { cursor })
    }

    // ── Consumer side ───────────────────────────────────────────────

    /// Take the oldest published entry, blocking until one exists.
    ///
    /// The slot is copied out and released back to producers before this
    /// returns. Must only be called from the single consumer.
    pub fn recv(&self, token: &ShutdownToken) -> Result<Received, IpcError> {
        if self.used.wait(token)? == Acquire::Cancelled {
            return Ok(Received::Cancelled);
        }

        let header = self.header();
        let cursor = header.read_cursor.load(Ordering::Acquire);
        // SAFETY: we hold a `used` unit, so a producer finished writing this
        // slot; producers cannot reuse it until we post `free` below.
        let record = unsafe { ptr::read(self.slot_ptr(cursor)) };
        header.read_cursor.store(cursor + 1, Ordering::Release);
        self.free.post()?;

        let solution = record.decode()?;
        Ok(Received::Entry { cursor, solution })
    }

    /// Tell every generator to stop and wake one that may be blocked on
    /// `free`; it passes the wake-up on as it leaves.
    pub fn signal_stop(&self) -> Result<(), IpcError> {
        self.header().signal.store(SIGNAL_STOP, Ordering::Release);
        self.free.post()
    }

    /// Whether the supervisor has asked generators to stop.
    pub fn stop_requested(&self) -> bool {
        self.header().stop_requested()
    }

    // ── Introspection ───────────────────────────────────────────────

    pub fn semaphore_values(&self) -> Result<SemaphoreValues, IpcError> {
        Ok(SemaphoreValues {
            free: self.free.value()?,
            used: self.used.value()?,
            write: self.write.value()?,
        })
    }

    /// Entries published but not yet received.
    pub fn outstanding(&self) -> u64 {
        let header = self.header();
        let written = header.write_cursor.load(Ordering::Acquire);
        let read = header.read_cursor.load(Ordering::Acquire);
        written.saturating_sub(read)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn header(&self) -> &RingHeader {
        header_of(&self.segment)
    }

    /// Post `write` whatever happened before; `earlier` wins if both fail.
    fn release_write(&self, earlier: Result<(), IpcError>) -> Result<(), IpcError> {
        if let Err(e) = &earlier {
            warn!(error = %e, "releasing write mutex after failed post");
        }
        self.write.post()?;
        earlier
    }

    fn slot_ptr(&self, cursor: u64) -> *mut SlotRecord {
        let state = self.segment.as_ptr().cast::<RingState>();
        // SAFETY: the segment is SEGMENT_SIZE bytes, i.e. one RingState, and
        // slot_index is always < CAPACITY.
        unsafe { ptr::addr_of_mut!((*state).slots[slot_index(cursor)]) }
    }
}

fn header_of(segment: &SharedSegment) -> &RingHeader {
    // SAFETY: every channel segment is SEGMENT_SIZE bytes, page aligned, and
    // the header consists of atomics only.
    unsafe { &(*segment.as_ptr().cast::<RingState>()).header }
}
