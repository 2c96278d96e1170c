//! tricolor-ipc: the shared ring buffer between one supervisor and many generators.
//!
//! # Architecture
//!
//! One POSIX shared-memory segment holds a header and a fixed array of
//! solution slots. Three named semaphores coordinate access:
//!
//! - `free` counts empty slots (starts at [`CAPACITY`])
//! - `used` counts filled slots (starts at 0)
//! - `write` serialises producers while they claim a slot and advance the
//!   write cursor
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  RingHeader: magic, version, capacity, signal, rd, wr         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  slots[0] .. slots[CAPACITY - 1]  (SlotRecord)                │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The supervisor creates (and finally unlinks) every object; generators
//! only attach and detach.

pub mod channel;
pub mod error;
pub mod layout;
pub mod segment;
pub mod semaphore;
pub mod shutdown;

pub use channel::{Publish, Received, Role, SemaphoreValues, SolutionChannel};
pub use error::IpcError;
pub use layout::{RingHeader, SlotRecord, CAPACITY, SEGMENT_SIZE};
pub use segment::SharedSegment;
pub use semaphore::{Acquire, NamedSemaphore};
pub use shutdown::ShutdownToken;
