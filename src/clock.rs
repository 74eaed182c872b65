use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::ffi::syscall;

/// Tick source used to time spans.
///
/// Durations are computed as `(end - start) * 1000 / frequency` milliseconds,
/// so `now` must be monotonic and `frequency` constant for the clock's lifetime.
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;

    /// Ticks per second.
    fn frequency(&self) -> u64;
}

/// `CLOCK_MONOTONIC` in nanoseconds.
#[derive(Clone, Copy, Debug, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> u64 {
        // `CLOCK_MONOTONIC` is always present on supported targets.
        syscall!(clock_monotonic_ns,).unwrap_or(0)
    }

    fn frequency(&self) -> u64 {
        1_000_000_000
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same tick counter.
#[derive(Clone, Debug)]
pub struct ManualClock {
    ticks: Arc<AtomicU64>,
    frequency: u64,
}

impl ManualClock {
    pub fn new(frequency: u64) -> Self {
        Self {
            ticks: Arc::new(AtomicU64::new(0)),
            frequency,
        }
    }

    pub fn advance(&self, ticks: u64) {
        self.ticks.fetch_add(ticks, Ordering::Relaxed);
    }

    pub fn set(&self, ticks: u64) {
        self.ticks.store(ticks, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    fn frequency(&self) -> u64 {
        self.frequency
    }
}

pub(crate) fn ticks_to_ms(ticks: u64, frequency: u64) -> f64 {
    if frequency == 0 {
        return 0.0;
    }
    ticks as f64 * 1000.0 / frequency as f64
}
