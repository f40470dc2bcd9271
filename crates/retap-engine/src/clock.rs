//! Time source abstraction.
//!
//! Pipeline passes take an explicit `now` so the manipulation logic is a
//! pure function of (queue contents, rule state, time). Production code
//! passes a [`MonotonicClock`]; tests drive a manual clock to make timeout
//! scenarios deterministic.

use std::time::Instant;

use retap_core::AbsoluteTime;

/// Source of the device-independent monotonic time used by entries.
pub trait Clock: Send + Sync {
    fn now(&self) -> AbsoluteTime;
}

/// Wall clock anchored at construction time.
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> AbsoluteTime {
        // u64 nanoseconds cover ~584 years of uptime; the truncation is
        // unreachable in practice.
        AbsoluteTime(self.origin.elapsed().as_nanos() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_never_goes_backwards() {
        // Arrange
        let clock = MonotonicClock::new();

        // Act
        let a = clock.now();
        let b = clock.now();

        // Assert
        assert!(b >= a);
    }
}
