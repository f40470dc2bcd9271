//! Function-key remapping, the third pipeline stage.
//!
//! Mechanically a sibling of the basic stage, but a separate stage with its
//! own table: function-key behaviour is configured independently of general
//! remaps and runs *after* the simultaneous stage, so combo outputs landing
//! on f-keys are left alone (they are `manipulated` and skipped).

use retap_core::{Entry, EventType, KeyCode};

use crate::manipulator::remapped_key_copy;
use crate::rules::FunctionKeyRule;

/// Remaps f1–f12 presses to their configured targets (typically media keys).
#[derive(Debug)]
pub struct FunctionKeyManipulator {
    rules: Vec<FunctionKeyRule>,
}

impl FunctionKeyManipulator {
    pub fn new(rules: &[FunctionKeyRule]) -> Self {
        Self {
            rules: rules.to_vec(),
        }
    }

    /// Returns the manipulated copy for a matching function-key entry.
    pub fn apply(&self, entry: &Entry) -> Option<Entry> {
        if !matches!(entry.event_type(), EventType::KeyDown | EventType::KeyUp) {
            return None;
        }
        let code = entry.event().key_code()?;
        if !code.is_function_key() {
            return None;
        }
        let to = self.lookup(code)?;
        tracing::debug!(from = %code, to = %to, "function key remap");
        Some(remapped_key_copy(entry, to))
    }

    fn lookup(&self, code: KeyCode) -> Option<KeyCode> {
        self.rules.iter().find(|rule| rule.from == code).map(|r| r.to)
    }
}
