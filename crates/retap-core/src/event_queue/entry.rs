//! One occurrence of an input event in the merged timeline.
//!
//! An [`Entry`] can be used safely in a multi-threaded environment: the
//! identity fields (`device_id`, `event`, `event_type`, `original_event`,
//! `event_origin`) are immutable after construction and read without
//! locking, while the manipulation flags and the accruing time stamp sit
//! behind one per-entry mutex. The pipeline thread mutates flags while a
//! diagnostics reader inspects them; readers and writers on *different*
//! entries never contend.
//!
//! # Snapshot form
//!
//! Every entry has a canonical JSON representation with the keys
//! `device_id, event_time_stamp, validity, state, lazy, event, event_type,
//! original_event, event_origin` (`validity` is encoded as an integer).
//! Decoding is tolerant: absent or malformed fields fall back to their
//! defaults and never abort processing of the rest of the stream.

use std::sync::Mutex;

use serde_json::Value;

use crate::event_queue::event::Event;
use crate::event_queue::event_time_stamp::{AbsoluteDuration, EventTimeStamp};
use crate::types::{DeviceId, EventOrigin, EventType, State, Validity};

/// The four mutable fields, guarded by one lock so a reader always observes
/// a consistent combination.
#[derive(Debug, Clone, Copy)]
struct SharedFields {
    event_time_stamp: EventTimeStamp,
    validity: Validity,
    state: State,
    lazy: bool,
}

/// One event occurrence: device origin, timing, payload, and the flags the
/// manipulator pipeline drives.
#[derive(Debug)]
pub struct Entry {
    device_id: DeviceId,

    // An entry is marked invalid when a manipulator consumes or suppresses
    // it. Invalidation is monotonic: any stage may invalidate, none may
    // revive, which is why there is an `invalidate()` and no inverse.
    //
    // The state flag is a separate one-way ratchet recording whether any
    // manipulator has ever touched the entry, across all stages:
    //
    // - basic remapping
    // - complex (simultaneous) rules
    // - function key remapping
    // - post to virtual devices
    shared: Mutex<SharedFields>,

    event: Event,
    event_type: EventType,
    original_event: Event,
    event_origin: EventOrigin,
}

impl Entry {
    /// Creates an entry with `validity = Valid` and `lazy = false`.
    ///
    /// Entries admitted for a raw device event carry `state = Original`;
    /// entries synthesized by a manipulator are `Manipulated` from birth.
    pub fn new(
        device_id: DeviceId,
        event_time_stamp: EventTimeStamp,
        event: Event,
        event_type: EventType,
        original_event: Event,
        event_origin: EventOrigin,
        state: State,
    ) -> Self {
        EntryBuilder::new()
            .device_id(device_id)
            .event_time_stamp(event_time_stamp)
            .event(event)
            .event_type(event_type)
            .original_event(original_event)
            .event_origin(event_origin)
            .state(state)
            .build()
    }

    /// Starts a builder seeded with the documented defaults.
    pub fn builder() -> EntryBuilder {
        EntryBuilder::new()
    }

    // ── Immutable accessors (no lock: there is no setter) ────────────────────

    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn original_event(&self) -> &Event {
        &self.original_event
    }

    pub fn event_origin(&self) -> EventOrigin {
        self.event_origin
    }

    // ── Synchronized accessors ───────────────────────────────────────────────

    /// Consistent copy of the timing pair.
    pub fn event_time_stamp(&self) -> EventTimeStamp {
        self.shared().event_time_stamp
    }

    /// Accrues deferral delay on the entry's time stamp. The accrued delay
    /// never decreases over an entry's lifetime.
    pub fn add_input_delay(&self, delay: AbsoluteDuration) {
        self.shared().event_time_stamp.add_input_delay(delay);
    }

    pub fn validity(&self) -> Validity {
        self.shared().validity
    }

    /// Marks the entry as consumed/suppressed. There is deliberately no way
    /// back to `Valid`: monotonic invalidation is enforced by construction
    /// rather than asserted at runtime.
    pub fn invalidate(&self) {
        self.shared().validity = Validity::Invalid;
    }

    pub fn state(&self) -> State {
        self.shared().state
    }

    /// Records that a manipulator has touched this entry. One-way: the flag
    /// never reverts to `Original`.
    pub fn mark_manipulated(&self) {
        self.shared().state = State::Manipulated;
    }

    pub fn lazy(&self) -> bool {
        self.shared().lazy
    }

    /// Sets the deferral flag. A lazy entry must not be forwarded to the
    /// sink until a manipulator resolves it and clears the flag.
    pub fn set_lazy(&self, lazy: bool) {
        self.shared().lazy = lazy;
    }

    fn shared(&self) -> std::sync::MutexGuard<'_, SharedFields> {
        self.shared.lock().expect("entry lock poisoned")
    }

    // ── Snapshot codec ───────────────────────────────────────────────────────

    /// Canonical JSON snapshot of the entry.
    pub fn to_json(&self) -> Value {
        let shared = *self.shared();
        serde_json::json!({
            "device_id": self.device_id,
            "event_time_stamp": shared.event_time_stamp.to_json(),
            "validity": shared.validity.to_int(),
            "state": shared.state,
            "lazy": shared.lazy,
            "event": self.event.to_json(),
            "event_type": self.event_type,
            "original_event": self.original_event.to_json(),
            "event_origin": self.event_origin,
        })
    }

    /// Decodes a snapshot. Never fails: every absent or malformed field
    /// falls back to its default (`device_id = 0`, zero time stamp, `none`
    /// payloads, `key_down`, `origin = none`, `state = original`,
    /// `validity = valid`, `lazy = false`). Losing one field must never
    /// abort processing of the rest of the event stream.
    pub fn from_json(value: &Value) -> Entry {
        let mut builder = EntryBuilder::new();

        if let Some(object) = value.as_object() {
            if let Some(v) = object.get("device_id") {
                builder = builder.device_id(decode_field(v, "device_id"));
            }
            if let Some(v) = object.get("event_time_stamp") {
                builder = builder.event_time_stamp(EventTimeStamp::from_json(v));
            }
            if let Some(v) = object.get("validity") {
                match v.as_i64() {
                    Some(raw) => builder = builder.validity(Validity::from_int(raw)),
                    None => tracing::debug!(field = "validity", "non-integer field dropped"),
                }
            }
            if let Some(v) = object.get("state") {
                builder = builder.state(decode_field(v, "state"));
            }
            if let Some(v) = object.get("lazy") {
                builder = builder.lazy(v.as_bool().unwrap_or_default());
            }
            if let Some(v) = object.get("event") {
                builder = builder.event(Event::from_json(v));
            }
            if let Some(v) = object.get("event_type") {
                builder = builder.event_type(decode_field(v, "event_type"));
            }
            if let Some(v) = object.get("original_event") {
                builder = builder.original_event(Event::from_json(v));
            }
            if let Some(v) = object.get("event_origin") {
                builder = builder.event_origin(decode_field(v, "event_origin"));
            }
        }

        builder.build()
    }
}

/// Parses one snapshot field, falling back to the type's default when the
/// value does not deserialize.
fn decode_field<T>(value: &Value, field: &'static str) -> T
where
    T: serde::de::DeserializeOwned + Default,
{
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => parsed,
        Err(error) => {
            tracing::debug!(field, %error, "malformed field dropped, using default");
            T::default()
        }
    }
}

impl Clone for Entry {
    fn clone(&self) -> Self {
        let shared = *self.shared();
        Entry {
            device_id: self.device_id,
            shared: Mutex::new(shared),
            event: self.event,
            event_type: self.event_type,
            original_event: self.original_event,
            event_origin: self.event_origin,
        }
    }
}

impl PartialEq for Entry {
    /// Value equality across every field, read through the accessors so the
    /// synchronized fields are compared as consistent snapshots.
    fn eq(&self, other: &Self) -> bool {
        // Copy each side's shared fields without holding both locks at once.
        let lhs = *self.shared();
        let rhs = *other.shared();

        self.device_id() == other.device_id()
            && lhs.event_time_stamp == rhs.event_time_stamp
            && lhs.validity == rhs.validity
            && lhs.state == rhs.state
            && lhs.lazy == rhs.lazy
            && self.event() == other.event()
            && self.event_type() == other.event_type()
            && self.original_event() == other.original_event()
            && self.event_origin() == other.event_origin()
    }
}

impl Eq for Entry {}

// ── Builder ───────────────────────────────────────────────────────────────────

/// Explicit default-entry builder.
///
/// Serves as the decode starting point for [`Entry::from_json`] and as the
/// convenient way to construct entries in tests; the defaults are exactly
/// the documented snapshot-decode fallbacks.
#[derive(Debug, Clone)]
pub struct EntryBuilder {
    device_id: DeviceId,
    event_time_stamp: EventTimeStamp,
    event: Event,
    event_type: EventType,
    original_event: Event,
    event_origin: EventOrigin,
    state: State,
    validity: Validity,
    lazy: bool,
}

impl Default for EntryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EntryBuilder {
    pub fn new() -> Self {
        Self {
            device_id: DeviceId(0),
            event_time_stamp: EventTimeStamp::default(),
            event: Event::None,
            event_type: EventType::KeyDown,
            original_event: Event::None,
            event_origin: EventOrigin::None,
            state: State::Original,
            validity: Validity::Valid,
            lazy: false,
        }
    }

    pub fn device_id(mut self, device_id: DeviceId) -> Self {
        self.device_id = device_id;
        self
    }

    pub fn event_time_stamp(mut self, event_time_stamp: EventTimeStamp) -> Self {
        self.event_time_stamp = event_time_stamp;
        self
    }

    /// Sets the current payload. `original_event` is left untouched; call
    /// [`EntryBuilder::original_event`] explicitly when they differ.
    pub fn event(mut self, event: Event) -> Self {
        self.event = event;
        self
    }

    pub fn event_type(mut self, event_type: EventType) -> Self {
        self.event_type = event_type;
        self
    }

    pub fn original_event(mut self, original_event: Event) -> Self {
        self.original_event = original_event;
        self
    }

    pub fn event_origin(mut self, event_origin: EventOrigin) -> Self {
        self.event_origin = event_origin;
        self
    }

    pub fn state(mut self, state: State) -> Self {
        self.state = state;
        self
    }

    pub fn validity(mut self, validity: Validity) -> Self {
        self.validity = validity;
        self
    }

    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    pub fn build(self) -> Entry {
        Entry {
            device_id: self.device_id,
            shared: Mutex::new(SharedFields {
                event_time_stamp: self.event_time_stamp,
                validity: self.validity,
                state: self.state,
                lazy: self.lazy,
            }),
            event: self.event,
            event_type: self.event_type,
            original_event: self.original_event,
            event_origin: self.event_origin,
        }
    }
}
