//! The manipulator stages.
//!
//! A manipulator is one of a closed set of variants dispatched through
//! [`Manipulator::run`]; the pipeline iterates the set generically and in a
//! fixed order. Each stage scans the queue front-to-back and may leave an
//! entry untouched, replace it with a manipulated copy, consume it while
//! synthesizing replacements, or defer it (`lazy`) until more input or a
//! timeout resolves it.
//!
//! Shared stage discipline:
//!
//! - invalid entries are skipped, never re-examined;
//! - mapping stages additionally skip `lazy` entries (owned by the
//!   simultaneous stage) and `manipulated` ones – the state ratchet is the
//!   signal that re-triggering earlier remap logic is unsafe;
//! - a transformation never edits a payload in place: it builds a new entry
//!   copy so the original event survives on the replacement.

pub mod basic;
pub mod function_keys;
pub mod post_virtual;
pub mod simultaneous;

use retap_core::{AbsoluteTime, Entry, Event, KeyCode, Queue, State, Validity};

pub use basic::BasicManipulator;
pub use function_keys::FunctionKeyManipulator;
pub use post_virtual::PostManipulator;
pub use simultaneous::SimultaneousManipulator;

/// Closed set of manipulator variants, in their fixed pipeline order.
#[derive(Debug)]
pub enum Manipulator {
    Basic(BasicManipulator),
    Simultaneous(SimultaneousManipulator),
    FunctionKeys(FunctionKeyManipulator),
    PostToVirtualDevices(PostManipulator),
}

impl Manipulator {
    /// Runs one scan of this stage over the queue.
    pub fn run(&mut self, queue: &Queue, now: AbsoluteTime) {
        match self {
            Manipulator::Basic(stage) => run_mapping_stage(queue, |entry| stage.apply(entry)),
            Manipulator::Simultaneous(stage) => stage.run(queue, now),
            Manipulator::FunctionKeys(stage) => {
                run_mapping_stage(queue, |entry| stage.apply(entry))
            }
            Manipulator::PostToVirtualDevices(stage) => stage.run(queue),
        }
    }

    /// Earliest time at which this stage needs to be re-run without new
    /// input, if any. Only the simultaneous stage defers.
    pub fn next_deadline(&self) -> Option<AbsoluteTime> {
        match self {
            Manipulator::Simultaneous(stage) => stage.next_deadline(),
            _ => None,
        }
    }

    /// Discards all pending stage state (pipeline teardown).
    pub fn reset(&mut self) {
        if let Manipulator::Simultaneous(stage) = self {
            stage.reset();
        }
    }
}

/// Runs a per-entry mapping stage: scans the queue and substitutes the
/// manipulated copy `apply` produces, if any.
fn run_mapping_stage(queue: &Queue, apply: impl Fn(&Entry) -> Option<Entry>) {
    for (index, entry) in queue.snapshot().iter().enumerate() {
        if entry.validity() == Validity::Invalid
            || entry.lazy()
            || entry.state() == State::Manipulated
        {
            continue;
        }
        if let Some(replacement) = apply(entry.as_ref()) {
            queue.replace(index, replacement);
        }
    }
}

/// Builds the manipulated copy of `entry` carrying `code` instead of its
/// current key. Identity, timing, and the original payload carry over.
pub(crate) fn remapped_key_copy(entry: &Entry, code: KeyCode) -> Entry {
    Entry::builder()
        .device_id(entry.device_id())
        .event_time_stamp(entry.event_time_stamp())
        .event(Event::Key { code })
        .event_type(entry.event_type())
        .original_event(*entry.original_event())
        .event_origin(entry.event_origin())
        .state(State::Manipulated)
        .build()
}

