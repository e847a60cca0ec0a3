//! Session clocks
//!
//! All capture timestamps are milliseconds since an origin taken when the
//! clock is created. [`MonotonicClock`] reads the platform's monotonic
//! high-resolution counter through [`Instant`], which is backed by
//! `QueryPerformanceCounter` on Windows, `mach_absolute_time` on macOS and
//! `clock_gettime(CLOCK_MONOTONIC)` on Linux. The counter frequency is
//! resolved by the standard library once per process, so readings are never
//! affected by wall-clock adjustments.

use std::cell::Cell;
use std::time::Instant;

/// Source of origin-relative millisecond timestamps
pub trait ClockSource {
    /// Elapsed milliseconds since the clock's origin.
    ///
    /// Successive calls never return a smaller value.
    fn now_ms(&self) -> f64;

    /// Name of the timing primitive, recorded in the session metadata
    fn name(&self) -> &'static str;
}

/// Name of the monotonic primitive backing [`Instant`] on this platform
pub fn platform_clock_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "QueryPerformanceCounter"
    } else if cfg!(any(target_os = "macos", target_os = "ios")) {
        "mach_absolute_time"
    } else {
        "clock_gettime(CLOCK_MONOTONIC)"
    }
}

/// Clock backed by the platform monotonic counter
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Capture the origin now
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::start()
    }
}

impl ClockSource for MonotonicClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }

    fn name(&self) -> &'static str {
        platform_clock_name()
    }
}

/// Clock that returns scripted readings, for replays and tests.
///
/// Each call to `now_ms` returns the next queued reading; once the queue is
/// exhausted the last reading repeats.
#[derive(Debug, Default)]
pub struct ManualClock {
    readings: Vec<f64>,
    next: Cell<usize>,
}

impl ManualClock {
    pub fn new(readings: impl Into<Vec<f64>>) -> Self {
        Self {
            readings: readings.into(),
            next: Cell::new(0),
        }
    }

    /// Number of readings handed out so far
    pub fn reads(&self) -> usize {
        self.next.get()
    }
}

impl ClockSource for ManualClock {
    fn now_ms(&self) -> f64 {
        let index = self.next.get();
        self.next.set(index + 1);
        self.readings
            .get(index)
            .or_else(|| self.readings.last())
            .copied()
            .unwrap_or(0.0)
    }

    fn name(&self) -> &'static str {
        "manual"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_clock_is_non_decreasing() {
        let clock = MonotonicClock::start();
        let mut last = clock.now_ms();
        for _ in 0..1000 {
            let now = clock.now_ms();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn monotonic_clock_starts_near_zero() {
        let clock = MonotonicClock::start();
        assert!(clock.now_ms() < 1000.0);
    }

    #[test]
    fn monotonic_clock_names_platform_primitive() {
        let clock = MonotonicClock::start();
        assert_eq!(clock.name(), platform_clock_name());
        assert!(!clock.name().is_empty());
    }

    #[test]
    fn manual_clock_replays_readings() {
        let clock = ManualClock::new(vec![10.0, 20.0]);
        assert_eq!(clock.now_ms(), 10.0);
        assert_eq!(clock.now_ms(), 20.0);
        assert_eq!(clock.now_ms(), 20.0);
        assert_eq!(clock.reads(), 3);
    }

    #[test]
    fn empty_manual_clock_reads_zero() {
        let clock = ManualClock::default();
        assert_eq!(clock.now_ms(), 0.0);
    }
}
