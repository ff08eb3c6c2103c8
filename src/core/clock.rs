// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Wraparound-safe monotonic time

use std::cell::Cell;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Seconds after which the 32-bit microsecond counter wraps, rounded up.
pub const CLOCK_WRAP_SECS: u64 = (u32::MAX as u64 + 1).div_ceil(1_000_000);

/// Instant on a free-running 32-bit microsecond counter.
///
/// The counter wraps roughly every 71.6 minutes. Differences are computed
/// with modular subtraction, so any two instants less than one wrap apart
/// yield the true forward duration even across the wrap point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp(u32);

impl Timestamp {
    /// Boot epoch. Also the report reference before anything was sent.
    pub const ZERO: Timestamp = Timestamp(0);

    pub const fn from_micros(micros: u32) -> Self {
        Self(micros)
    }

    pub const fn as_micros(self) -> u32 {
        self.0
    }

    /// Forward duration from `earlier` to `self`.
    pub fn elapsed_since(self, earlier: Timestamp) -> Duration {
        Duration::from_micros(u64::from(self.0.wrapping_sub(earlier.0)))
    }

    /// Instant `by` after `self`, wrapping like the hardware counter.
    pub fn advanced(self, by: Duration) -> Timestamp {
        // truncation to 32 bits is the wrap
        Timestamp(self.0.wrapping_add(by.as_micros() as u32))
    }
}

/// Source of monotonic timestamps
pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Clock backed by `std::time::Instant`, folded onto the 32-bit counter.
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.origin.elapsed().as_micros() as u32)
    }
}

/// Manually driven clock for tests and simulation
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Timestamp>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self { now: Cell::new(start) }
    }

    pub fn set(&self, at: Timestamp) {
        self.now.set(at);
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get().advanced(by));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_plain() {
        let a = Timestamp::from_micros(1_000);
        let b = Timestamp::from_micros(101_000);
        assert_eq!(b.elapsed_since(a), Duration::from_millis(100));
    }

    #[test]
    fn test_elapsed_across_wrap() {
        let before = Timestamp::from_micros(u32::MAX - 49_999);
        let after = Timestamp::from_micros(50_000);
        assert_eq!(after.elapsed_since(before), Duration::from_micros(100_000));
    }

    #[test]
    fn test_advanced_wraps() {
        let t = Timestamp::from_micros(u32::MAX).advanced(Duration::from_micros(2));
        assert_eq!(t.as_micros(), 1);
    }

    #[test]
    fn test_wrap_constant() {
        assert_eq!(CLOCK_WRAP_SECS, 4295);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(Timestamp::ZERO);
        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now(), Timestamp::from_micros(250_000));
        clock.set(Timestamp::from_micros(7));
        assert_eq!(clock.now().as_micros(), 7);
    }

    #[test]
    fn test_monotonic_clock_moves_forward() {
        let clock = MonotonicClock::new();
        let a = clock.now();
        std::thread::sleep(Duration::from_millis(2));
        let b = clock.now();
        assert!(b.elapsed_since(a) >= Duration::from_millis(2));
    }
}
