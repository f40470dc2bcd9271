//! # retap-core
//!
//! Shared event model for Retap: key code tables, event payloads, time
//! stamps, queue entries, the admission-ordered event queue, and the
//! tolerant JSON snapshot codec.
//!
//! This crate is used by the manipulation engine and the replay daemon.
//! It has zero dependencies on OS APIs, device IO, or async runtimes.
//!
//! The central type is the [`event_queue::Entry`]: one occurrence of an
//! input event in the merged timeline of all grabbed devices. Entries are
//! individually thread-safe – their identity fields are immutable and read
//! without locking, while the manipulation flags (`validity`, `state`,
//! `lazy`) and the accruing time stamp sit behind one per-entry mutex so a
//! diagnostics reader never races the pipeline thread.

pub mod event_queue;
pub mod keymap;
pub mod types;

// Re-export the most-used types at the crate root so callers can write
// `retap_core::Entry` instead of `retap_core::event_queue::entry::Entry`.
pub use event_queue::entry::{Entry, EntryBuilder};
pub use event_queue::event::{Event, PointerMotion};
pub use event_queue::event_time_stamp::{AbsoluteDuration, AbsoluteTime, EventTimeStamp};
pub use event_queue::queue::Queue;
pub use keymap::{KeyCode, UnknownKeyError};
pub use types::{DeviceId, EventOrigin, EventType, PointerButton, State, Validity};
