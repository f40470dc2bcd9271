//! Key code table for keyboard event identity.
//!
//! The canonical key representation is the USB HID Usage ID (page 0x07,
//! Keyboard/Keypad page). Rule files and snapshots refer to keys by
//! well-known names (`"caps_lock"`, `"escape"`, ...); this module owns the
//! bidirectional name/code translation.
//!
//! Reference: USB HID Usage Tables 1.3, Section 10 (Keyboard/Keypad page 0x07).
//!
//! # Unknown keys
//!
//! Hardware can deliver usages this table has no name for (vendor keys,
//! exotic layouts). Those still round-trip: [`KeyCode`] wraps the raw usage
//! and serializes as a bare number when no name exists. Only *names* can be
//! unknown, and only on input – [`KeyCode::from_name`] returns
//! [`UnknownKeyError`] so a rule file with a typo fails validation instead of
//! silently matching nothing.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// A key name that is not present in the translation table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognised key name: {0:?}")]
pub struct UnknownKeyError(pub String);

/// USB HID Usage ID on the keyboard/keypad page (0x07).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct KeyCode(pub u16);

impl KeyCode {
    // Letters (HID 0x04–0x1D)
    pub const A: KeyCode = KeyCode(0x04);
    pub const B: KeyCode = KeyCode(0x05);
    pub const C: KeyCode = KeyCode(0x06);
    pub const D: KeyCode = KeyCode(0x07);
    pub const E: KeyCode = KeyCode(0x08);
    pub const F: KeyCode = KeyCode(0x09);
    pub const G: KeyCode = KeyCode(0x0A);
    pub const H: KeyCode = KeyCode(0x0B);
    pub const I: KeyCode = KeyCode(0x0C);
    pub const J: KeyCode = KeyCode(0x0D);
    pub const K: KeyCode = KeyCode(0x0E);
    pub const L: KeyCode = KeyCode(0x0F);
    pub const M: KeyCode = KeyCode(0x10);
    pub const N: KeyCode = KeyCode(0x11);
    pub const O: KeyCode = KeyCode(0x12);
    pub const P: KeyCode = KeyCode(0x13);
    pub const Q: KeyCode = KeyCode(0x14);
    pub const R: KeyCode = KeyCode(0x15);
    pub const S: KeyCode = KeyCode(0x16);
    pub const T: KeyCode = KeyCode(0x17);
    pub const U: KeyCode = KeyCode(0x18);
    pub const V: KeyCode = KeyCode(0x19);
    pub const W: KeyCode = KeyCode(0x1A);
    pub const X: KeyCode = KeyCode(0x1B);
    pub const Y: KeyCode = KeyCode(0x1C);
    pub const Z: KeyCode = KeyCode(0x1D);

    // Control keys
    pub const RETURN_OR_ENTER: KeyCode = KeyCode(0x28);
    pub const ESCAPE: KeyCode = KeyCode(0x29);
    pub const DELETE_OR_BACKSPACE: KeyCode = KeyCode(0x2A);
    pub const TAB: KeyCode = KeyCode(0x2B);
    pub const SPACEBAR: KeyCode = KeyCode(0x2C);
    pub const CAPS_LOCK: KeyCode = KeyCode(0x39);

    // Function keys (HID 0x3A–0x45)
    pub const F1: KeyCode = KeyCode(0x3A);
    pub const F2: KeyCode = KeyCode(0x3B);
    pub const F3: KeyCode = KeyCode(0x3C);
    pub const F4: KeyCode = KeyCode(0x3D);
    pub const F5: KeyCode = KeyCode(0x3E);
    pub const F6: KeyCode = KeyCode(0x3F);
    pub const F7: KeyCode = KeyCode(0x40);
    pub const F8: KeyCode = KeyCode(0x41);
    pub const F9: KeyCode = KeyCode(0x42);
    pub const F10: KeyCode = KeyCode(0x43);
    pub const F11: KeyCode = KeyCode(0x44);
    pub const F12: KeyCode = KeyCode(0x45);

    // Media keys on the keyboard page
    pub const MUTE: KeyCode = KeyCode(0x7F);
    pub const VOLUME_UP: KeyCode = KeyCode(0x80);
    pub const VOLUME_DOWN: KeyCode = KeyCode(0x81);

    // Modifiers (HID 0xE0–0xE7)
    pub const LEFT_CONTROL: KeyCode = KeyCode(0xE0);
    pub const LEFT_SHIFT: KeyCode = KeyCode(0xE1);
    pub const LEFT_ALT: KeyCode = KeyCode(0xE2);
    pub const LEFT_GUI: KeyCode = KeyCode(0xE3);
    pub const RIGHT_CONTROL: KeyCode = KeyCode(0xE4);
    pub const RIGHT_SHIFT: KeyCode = KeyCode(0xE5);
    pub const RIGHT_ALT: KeyCode = KeyCode(0xE6);
    pub const RIGHT_GUI: KeyCode = KeyCode(0xE7);

    /// Returns the well-known name for this code, if the table has one.
    pub fn name(self) -> Option<&'static str> {
        code_to_name(self.0)
    }

    /// Resolves a well-known name to its key code.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownKeyError`] when `name` is not in the table. Rule
    /// validation relies on this being an error rather than a fallback.
    pub fn from_name(name: &str) -> Result<KeyCode, UnknownKeyError> {
        name_to_code(name)
            .map(KeyCode)
            .ok_or_else(|| UnknownKeyError(name.to_string()))
    }

    /// Whether this code is in the F1–F12 range targeted by the
    /// function-key manipulator stage.
    pub fn is_function_key(self) -> bool {
        (Self::F1.0..=Self::F12.0).contains(&self.0)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:02x}", self.0),
        }
    }
}

/// Translates a HID usage to its well-known name.
fn code_to_name(code: u16) -> Option<&'static str> {
    match code {
        0x04 => Some("a"),
        0x05 => Some("b"),
        0x06 => Some("c"),
        0x07 => Some("d"),
        0x08 => Some("e"),
        0x09 => Some("f"),
        0x0A => Some("g"),
        0x0B => Some("h"),
        0x0C => Some("i"),
        0x0D => Some("j"),
        0x0E => Some("k"),
        0x0F => Some("l"),
        0x10 => Some("m"),
        0x11 => Some("n"),
        0x12 => Some("o"),
        0x13 => Some("p"),
        0x14 => Some("q"),
        0x15 => Some("r"),
        0x16 => Some("s"),
        0x17 => Some("t"),
        0x18 => Some("u"),
        0x19 => Some("v"),
        0x1A => Some("w"),
        0x1B => Some("x"),
        0x1C => Some("y"),
        0x1D => Some("z"),
        0x1E => Some("1"),
        0x1F => Some("2"),
        0x20 => Some("3"),
        0x21 => Some("4"),
        0x22 => Some("5"),
        0x23 => Some("6"),
        0x24 => Some("7"),
        0x25 => Some("8"),
        0x26 => Some("9"),
        0x27 => Some("0"),
        0x28 => Some("return_or_enter"),
        0x29 => Some("escape"),
        0x2A => Some("delete_or_backspace"),
        0x2B => Some("tab"),
        0x2C => Some("spacebar"),
        0x2D => Some("hyphen"),
        0x2E => Some("equal_sign"),
        0x2F => Some("open_bracket"),
        0x30 => Some("close_bracket"),
        0x31 => Some("backslash"),
        0x33 => Some("semicolon"),
        0x34 => Some("quote"),
        0x35 => Some("grave_accent"),
        0x36 => Some("comma"),
        0x37 => Some("period"),
        0x38 => Some("slash"),
        0x39 => Some("caps_lock"),
        0x3A => Some("f1"),
        0x3B => Some("f2"),
        0x3C => Some("f3"),
        0x3D => Some("f4"),
        0x3E => Some("f5"),
        0x3F => Some("f6"),
        0x40 => Some("f7"),
        0x41 => Some("f8"),
        0x42 => Some("f9"),
        0x43 => Some("f10"),
        0x44 => Some("f11"),
        0x45 => Some("f12"),
        0x46 => Some("print_screen"),
        0x47 => Some("scroll_lock"),
        0x48 => Some("pause"),
        0x49 => Some("insert"),
        0x4A => Some("home"),
        0x4B => Some("page_up"),
        0x4C => Some("delete_forward"),
        0x4D => Some("end"),
        0x4E => Some("page_down"),
        0x4F => Some("right_arrow"),
        0x50 => Some("left_arrow"),
        0x51 => Some("down_arrow"),
        0x52 => Some("up_arrow"),
        0x7F => Some("mute"),
        0x80 => Some("volume_up"),
        0x81 => Some("volume_down"),
        0xE0 => Some("left_control"),
        0xE1 => Some("left_shift"),
        0xE2 => Some("left_alt"),
        0xE3 => Some("left_gui"),
        0xE4 => Some("right_control"),
        0xE5 => Some("right_shift"),
        0xE6 => Some("right_alt"),
        0xE7 => Some("right_gui"),
        _ => None,
    }
}

/// Translates a well-known name to its HID usage.
fn name_to_code(name: &str) -> Option<u16> {
    match name {
        "a" => Some(0x04),
        "b" => Some(0x05),
        "c" => Some(0x06),
        "d" => Some(0x07),
        "e" => Some(0x08),
        "f" => Some(0x09),
        "g" => Some(0x0A),
        "h" => Some(0x0B),
        "i" => Some(0x0C),
        "j" => Some(0x0D),
        "k" => Some(0x0E),
        "l" => Some(0x0F),
        "m" => Some(0x10),
        "n" => Some(0x11),
        "o" => Some(0x12),
        "p" => Some(0x13),
        "q" => Some(0x14),
        "r" => Some(0x15),
        "s" => Some(0x16),
        "t" => Some(0x17),
        "u" => Some(0x18),
        "v" => Some(0x19),
        "w" => Some(0x1A),
        "x" => Some(0x1B),
        "y" => Some(0x1C),
        "z" => Some(0x1D),
        "1" => Some(0x1E),
        "2" => Some(0x1F),
        "3" => Some(0x20),
        "4" => Some(0x21),
        "5" => Some(0x22),
        "6" => Some(0x23),
        "7" => Some(0x24),
        "8" => Some(0x25),
        "9" => Some(0x26),
        "0" => Some(0x27),
        "return_or_enter" => Some(0x28),
        "escape" => Some(0x29),
        "delete_or_backspace" => Some(0x2A),
        "tab" => Some(0x2B),
        "spacebar" => Some(0x2C),
        "hyphen" => Some(0x2D),
        "equal_sign" => Some(0x2E),
        "open_bracket" => Some(0x2F),
        "close_bracket" => Some(0x30),
        "backslash" => Some(0x31),
        "semicolon" => Some(0x33),
        "quote" => Some(0x34),
        "grave_accent" => Some(0x35),
        "comma" => Some(0x36),
        "period" => Some(0x37),
        "slash" => Some(0x38),
        "caps_lock" => Some(0x39),
        "f1" => Some(0x3A),
        "f2" => Some(0x3B),
        "f3" => Some(0x3C),
        "f4" => Some(0x3D),
        "f5" => Some(0x3E),
        "f6" => Some(0x3F),
        "f7" => Some(0x40),
        "f8" => Some(0x41),
        "f9" => Some(0x42),
        "f10" => Some(0x43),
        "f11" => Some(0x44),
        "f12" => Some(0x45),
        "print_screen" => Some(0x46),
        "scroll_lock" => Some(0x47),
        "pause" => Some(0x48),
        "insert" => Some(0x49),
        "home" => Some(0x4A),
        "page_up" => Some(0x4B),
        "delete_forward" => Some(0x4C),
        "end" => Some(0x4D),
        "page_down" => Some(0x4E),
        "right_arrow" => Some(0x4F),
        "left_arrow" => Some(0x50),
        "down_arrow" => Some(0x51),
        "up_arrow" => Some(0x52),
        "mute" => Some(0x7F),
        "volume_up" => Some(0x80),
        "volume_down" => Some(0x81),
        "left_control" => Some(0xE0),
        "left_shift" => Some(0xE1),
        "left_alt" => Some(0xE2),
        "left_gui" => Some(0xE3),
        "right_control" => Some(0xE4),
        "right_shift" => Some(0xE5),
        "right_alt" => Some(0xE6),
        "right_gui" => Some(0xE7),
        _ => None,
    }
}

// Serde: named keys serialize as their name, unnamed usages as a bare
// number; both forms are accepted on input.

impl Serialize for KeyCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.name() {
            Some(name) => serializer.serialize_str(name),
            None => serializer.serialize_u16(self.0),
        }
    }
}

struct KeyCodeVisitor;

impl<'de> Visitor<'de> for KeyCodeVisitor {
    type Value = KeyCode;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a key name string or a HID usage number")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<KeyCode, E> {
        KeyCode::from_name(value).map_err(|e| E::custom(e))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<KeyCode, E> {
        u16::try_from(value)
            .map(KeyCode)
            .map_err(|_| E::custom(format!("key code {value} exceeds u16 range")))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<KeyCode, E> {
        u16::try_from(value)
            .map(KeyCode)
            .map_err(|_| E::custom(format!("key code {value} out of u16 range")))
    }
}

impl<'de> Deserialize<'de> for KeyCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<KeyCode, D::Error> {
        deserializer.deserialize_any(KeyCodeVisitor)
    }
}
