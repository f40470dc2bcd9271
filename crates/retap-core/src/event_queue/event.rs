//! Concrete input event payloads.
//!
//! An [`Event`] is immutable once constructed: manipulators that transform
//! an entry build a new event value (and a new entry carrying it) rather
//! than editing the payload in place, so the original payload survives for
//! later comparison.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::keymap::KeyCode;
use crate::types::PointerButton;

/// Relative pointer movement and wheel deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PointerMotion {
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default)]
    pub vertical_wheel: i32,
    #[serde(default)]
    pub horizontal_wheel: i32,
}

/// Tagged union over concrete input payloads.
///
/// `None` is the construction default and what malformed snapshot payloads
/// decode to. Equality is structural.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    #[default]
    None,
    Key {
        code: KeyCode,
    },
    Button {
        button: PointerButton,
    },
    PointerMotion(PointerMotion),
}

impl Event {
    /// The key code, when this is a key event.
    pub fn key_code(&self) -> Option<KeyCode> {
        match self {
            Event::Key { code } => Some(*code),
            _ => None,
        }
    }

    /// Tolerant snapshot decode: anything that does not parse as a known
    /// payload decodes as [`Event::None`]. This must never fail – a dropped
    /// payload must not abort processing of the rest of a snapshot stream.
    pub fn from_json(value: &Value) -> Self {
        match serde_json::from_value(value.clone()) {
            Ok(event) => event,
            Err(error) => {
                tracing::debug!(%error, "unparseable event payload, defaulting to none");
                Event::None
            }
        }
    }

    /// Canonical snapshot form.
    pub fn to_json(&self) -> Value {
        // Serializing a self-describing enum into a Value cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
