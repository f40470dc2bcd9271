//! Scalar types shared by the whole event model: device identity and the
//! closed enums describing an entry's kind, provenance, and lifecycle flags.
//!
//! The lifecycle flags deserve a note because their transition rules differ:
//!
//! - [`State`] is a one-way ratchet. Once any manipulator stage has touched
//!   an entry it is `Manipulated` forever; later stages use this to decide
//!   whether re-triggering earlier remap logic is safe.
//! - [`Validity`] is monotonic within a pipeline pass: any stage may
//!   invalidate, no stage may revive. The entry API enforces this by
//!   construction – see [`crate::event_queue::entry::Entry::invalidate`].

use serde::{Deserialize, Serialize};

/// Opaque identifier of a physical (or virtual) input source.
///
/// Assigned by the device-grabbing collaborator; immutable once attached to
/// an entry. `DeviceId(0)` is the decode default for snapshots that omit it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DeviceId(pub u32);

/// Classifies an event occurrence.
///
/// `Single` covers stateless, instantaneous events such as pointer motion,
/// which have no paired down/up counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    #[default]
    KeyDown,
    KeyUp,
    Single,
}

/// Where an entry came from.
///
/// `None` is the construction/decode default; real device input is tagged
/// `GrabbedDevice`, loopback from our own synthetic devices `VirtualDevice`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOrigin {
    #[default]
    None,
    GrabbedDevice,
    VirtualDevice,
}

/// Whether a manipulator has ever touched this entry.
///
/// Starts at `Original`; set to `Manipulated` when a stage rewrites or
/// synthesizes the entry, and never reverts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    #[default]
    Original,
    Manipulated,
}

/// Whether an entry may still be forwarded to the output sink.
///
/// Snapshots encode validity as an integer: valid = 1, invalid = 0. Decoding
/// treats any unrecognised integer as the default (`Valid`) to keep snapshot
/// parsing total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Validity {
    #[default]
    Valid,
    Invalid,
}

impl Validity {
    /// Integer form used by the snapshot codec.
    pub fn to_int(self) -> i64 {
        match self {
            Validity::Valid => 1,
            Validity::Invalid => 0,
        }
    }

    /// Decodes the snapshot integer form; out-of-domain values fall back to
    /// `Valid`.
    pub fn from_int(value: i64) -> Self {
        match value {
            0 => Validity::Invalid,
            _ => Validity::Valid,
        }
    }
}

/// Pointer button identifier carried by button events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerButton {
    Left,
    Right,
    Middle,
    Button4,
    Button5,
}
