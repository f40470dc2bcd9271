//! Basic key remapping, the first pipeline stage.

use retap_core::{Entry, EventType, KeyCode};

use crate::manipulator::remapped_key_copy;
use crate::rules::BasicRule;

/// Stateless single-key remapper. First matching rule wins.
#[derive(Debug)]
pub struct BasicManipulator {
    rules: Vec<BasicRule>,
}

impl BasicManipulator {
    pub fn new(rules: &[BasicRule]) -> Self {
        Self {
            rules: rules.to_vec(),
        }
    }

    /// Returns the manipulated copy for a matching key entry, `None` to
    /// leave the entry untouched.
    pub fn apply(&self, entry: &Entry) -> Option<Entry> {
        if !matches!(entry.event_type(), EventType::KeyDown | EventType::KeyUp) {
            return None;
        }
        let code = entry.event().key_code()?;
        let to = self.lookup(code)?;
        tracing::debug!(from = %code, to = %to, "basic remap");
        Some(remapped_key_copy(entry, to))
    }

    fn lookup(&self, code: KeyCode) -> Option<KeyCode> {
        self.rules.iter().find(|rule| rule.from == code).map(|r| r.to)
    }
}
