//! Rule set configuration consumed by the manipulator stages.
//!
//! The rule set arrives pre-parsed (the daemon deserializes it from TOML;
//! other hosts may construct it directly). Every collection field defaults
//! to empty so a minimal config is valid, mirroring how the daemon's config
//! schema treats absent sections.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use retap_core::{AbsoluteDuration, KeyCode};

/// Structural problems a rule set can have.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    /// A simultaneous rule listed fewer than two keys.
    #[error("simultaneous rule needs at least two keys, got {0}")]
    TooFewKeys(usize),

    /// A simultaneous rule listed the same key twice.
    #[error("simultaneous rule lists key {0} twice")]
    DuplicateKey(KeyCode),

    /// A simultaneous rule has no output keys to emit on a match.
    #[error("simultaneous rule maps {0} to nothing")]
    EmptyOutput(KeyCode),

    /// A simultaneous rule's detection window is zero.
    #[error("simultaneous rule timeout must be non-zero")]
    ZeroTimeout,

    /// A function-key rule's source key is outside f1–f12.
    #[error("function key rule source {0} is not a function key")]
    NotAFunctionKey(KeyCode),
}

/// Single-key remap applied by the basic stage. First matching rule wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicRule {
    pub from: KeyCode,
    pub to: KeyCode,
}

/// Simultaneous-key rule applied by the complex stage.
///
/// When every key in `keys` is pressed within `timeout_ms` of the first
/// one, the presses are consumed and `to` is emitted instead. The timeout
/// is a rule parameter, not an engine constant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimultaneousRule {
    pub keys: Vec<KeyCode>,
    pub to: Vec<KeyCode>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl SimultaneousRule {
    /// The detection window as an engine duration.
    pub fn timeout(&self) -> AbsoluteDuration {
        AbsoluteDuration::from_millis(self.timeout_ms)
    }
}

/// Function-key remap applied by the function-key stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionKeyRule {
    pub from: KeyCode,
    pub to: KeyCode,
}

/// The full ordered manipulator configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub basic: Vec<BasicRule>,
    #[serde(default)]
    pub simultaneous: Vec<SimultaneousRule>,
    #[serde(default)]
    pub function_keys: Vec<FunctionKeyRule>,
}

impl RuleSet {
    /// Checks structural validity of every rule.
    ///
    /// # Errors
    ///
    /// Returns the first [`RuleError`] encountered; the pipeline refuses to
    /// build from an invalid set.
    pub fn validate(&self) -> Result<(), RuleError> {
        for rule in &self.simultaneous {
            if rule.keys.len() < 2 {
                return Err(RuleError::TooFewKeys(rule.keys.len()));
            }
            for (i, key) in rule.keys.iter().enumerate() {
                if rule.keys[..i].contains(key) {
                    return Err(RuleError::DuplicateKey(*key));
                }
            }
            if rule.to.is_empty() {
                return Err(RuleError::EmptyOutput(rule.keys[0]));
            }
            if rule.timeout_ms == 0 {
                return Err(RuleError::ZeroTimeout);
            }
        }
        for rule in &self.function_keys {
            if !rule.from.is_function_key() {
                return Err(RuleError::NotAFunctionKey(rule.from));
            }
        }
        Ok(())
    }
}

fn default_timeout_ms() -> u64 {
    50
}
