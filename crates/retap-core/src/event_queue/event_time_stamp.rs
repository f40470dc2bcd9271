//! Event timing: the monotonic time point an event occurred at and the
//! artificial delay the pipeline has introduced on top of it.
//!
//! # Why two numbers?
//!
//! A manipulator that must see *future* events before it can commit to a
//! transformation (the simultaneous-key stage) holds entries back. When such
//! an entry is finally forwarded, its `time_stamp` still says when the user
//! pressed the key, and `input_delay_duration` says how long the pipeline
//! sat on it. Consumers that care about true input latency subtract the
//! delay; consumers that only order events use the time stamp alone.

use std::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A point on the device-independent monotonic clock, in nanoseconds since
/// an arbitrary process-local origin.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AbsoluteTime(pub u64);

/// A non-negative span between two [`AbsoluteTime`] points, in nanoseconds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AbsoluteDuration(pub u64);

impl AbsoluteTime {
    pub const ZERO: AbsoluteTime = AbsoluteTime(0);

    pub fn from_millis(ms: u64) -> Self {
        AbsoluteTime(ms.saturating_mul(1_000_000))
    }

    /// Span from `earlier` to `self`; zero when `earlier` is in the future.
    pub fn saturating_since(self, earlier: AbsoluteTime) -> AbsoluteDuration {
        AbsoluteDuration(self.0.saturating_sub(earlier.0))
    }
}

impl AbsoluteDuration {
    pub const ZERO: AbsoluteDuration = AbsoluteDuration(0);

    pub fn from_millis(ms: u64) -> Self {
        AbsoluteDuration(ms.saturating_mul(1_000_000))
    }

    pub fn as_nanos(self) -> u64 {
        self.0
    }
}

impl Add<AbsoluteDuration> for AbsoluteTime {
    type Output = AbsoluteTime;

    fn add(self, rhs: AbsoluteDuration) -> AbsoluteTime {
        AbsoluteTime(self.0.saturating_add(rhs.0))
    }
}

impl Add for AbsoluteDuration {
    type Output = AbsoluteDuration;

    fn add(self, rhs: AbsoluteDuration) -> AbsoluteDuration {
        AbsoluteDuration(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for AbsoluteDuration {
    fn add_assign(&mut self, rhs: AbsoluteDuration) {
        *self = *self + rhs;
    }
}

impl Sub for AbsoluteTime {
    type Output = AbsoluteDuration;

    fn sub(self, rhs: AbsoluteTime) -> AbsoluteDuration {
        self.saturating_since(rhs)
    }
}

/// The timing pair attached to every queue entry.
///
/// `time_stamp` is the monotonic, device-independent ordering key;
/// `input_delay_duration` accumulates whenever the pipeline deliberately
/// holds the entry back, and only ever grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EventTimeStamp {
    time_stamp: AbsoluteTime,
    input_delay_duration: AbsoluteDuration,
}

impl EventTimeStamp {
    /// Creates a time stamp with no accrued delay.
    pub fn new(time_stamp: AbsoluteTime) -> Self {
        Self {
            time_stamp,
            input_delay_duration: AbsoluteDuration::ZERO,
        }
    }

    /// Creates a time stamp with an already-accrued delay (snapshot decode,
    /// synthesized entries).
    pub fn with_delay(time_stamp: AbsoluteTime, input_delay_duration: AbsoluteDuration) -> Self {
        Self {
            time_stamp,
            input_delay_duration,
        }
    }

    pub fn time_stamp(&self) -> AbsoluteTime {
        self.time_stamp
    }

    pub fn input_delay_duration(&self) -> AbsoluteDuration {
        self.input_delay_duration
    }

    /// Accrues deferral delay. Accrual is the only mutation: the delay of a
    /// live entry never decreases.
    pub fn add_input_delay(&mut self, delay: AbsoluteDuration) {
        self.input_delay_duration += delay;
    }

    /// Tolerant snapshot decode: missing or malformed fields fall back to
    /// zero, mirroring the entry-level decode policy.
    pub fn from_json(value: &Value) -> Self {
        let field = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_u64)
                .unwrap_or_default()
        };
        Self {
            time_stamp: AbsoluteTime(field("time_stamp")),
            input_delay_duration: AbsoluteDuration(field("input_delay_duration")),
        }
    }

    /// Canonical snapshot form.
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "time_stamp": self.time_stamp.0,
            "input_delay_duration": self.input_delay_duration.0,
        })
    }
}
