//! The in-memory event timeline: time stamps, event payloads, queue entries,
//! and the admission-ordered queue the manipulator pipeline operates on.

pub mod entry;
pub mod event;
pub mod event_time_stamp;
pub mod queue;

pub use entry::{Entry, EntryBuilder};
pub use event::{Event, PointerMotion};
pub use event_time_stamp::{AbsoluteDuration, AbsoluteTime, EventTimeStamp};
pub use queue::Queue;
