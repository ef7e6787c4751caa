//! Timing source.
//!
//! The board exposes a free-running cycle counter; the harness only needs
//! `now()` ticks and a tick frequency to turn elapsed counts into
//! microseconds. On a host, [`HostTimebase`] backs the same interface with
//! the monotonic clock (one tick = one nanosecond). [`ManualTimebase`]
//! lets tests script elapsed time deterministically.
//!
//! A missing timebase is the one startup-fatal condition in the harness:
//! every benchmark number depends on it.

use crate::error::{Result, SgdmaError};
use std::cell::Cell;
use std::time::Instant;

/// Free-running monotonic tick counter.
pub trait Timebase {
    /// Current tick count.
    fn now(&self) -> u64;

    /// Ticks per second.
    fn frequency(&self) -> u32;
}

/// Convert an elapsed tick count to microseconds.
pub fn ticks_to_us(ticks: u64, frequency: u32) -> u64 {
    // u128 intermediate: ticks * 1e6 overflows u64 for long runs at GHz.
    #[allow(clippy::cast_possible_truncation)]
    let us = (u128::from(ticks) * 1_000_000 / u128::from(frequency)) as u64;
    us
}

/// Host monotonic clock as a tick counter (nanosecond ticks).
#[derive(Debug)]
pub struct HostTimebase {
    epoch: Instant,
}

impl HostTimebase {
    /// Probe the host clock.
    ///
    /// # Errors
    ///
    /// Returns [`SgdmaError::TimebaseUnavailable`] if the monotonic clock
    /// does not advance between two reads separated by a yield.
    pub fn probe() -> Result<Self> {
        let epoch = Instant::now();
        for _ in 0..1_000 {
            if Instant::now() > epoch {
                return Ok(Self { epoch });
            }
            std::thread::yield_now();
        }
        Err(SgdmaError::timebase_unavailable(
            "monotonic clock not advancing",
        ))
    }
}

impl Timebase for HostTimebase {
    fn now(&self) -> u64 {
        #[allow(clippy::cast_possible_truncation)]
        let ticks = self.epoch.elapsed().as_nanos() as u64;
        ticks
    }

    fn frequency(&self) -> u32 {
        1_000_000_000
    }
}

/// Scripted tick counter for tests: each `now()` read advances by a fixed
/// step, so "elapsed cycles" are deterministic.
#[derive(Debug)]
pub struct ManualTimebase {
    ticks: Cell<u64>,
    step: u64,
    frequency: u32,
}

impl ManualTimebase {
    /// Counter advancing `step` ticks per read at `frequency` ticks/s.
    pub fn new(step: u64, frequency: u32) -> Self {
        Self {
            ticks: Cell::new(0),
            step,
            frequency,
        }
    }
}

impl Timebase for ManualTimebase {
    fn now(&self) -> u64 {
        let t = self.ticks.get();
        self.ticks.set(t + self.step);
        t
    }

    fn frequency(&self) -> u32 {
        self.frequency
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_timebase_probes_and_advances() {
        let tb = HostTimebase::probe().unwrap();
        let a = tb.now();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let b = tb.now();
        assert!(b > a);
    }

    #[test]
    fn tick_conversion() {
        // 50 MHz counter: 50 ticks = 1 µs.
        assert_eq!(ticks_to_us(50, 50_000_000), 1);
        assert_eq!(ticks_to_us(125_000, 50_000_000), 2_500);
        // No overflow at nanosecond resolution over an hour.
        assert_eq!(ticks_to_us(3_600_000_000_000, 1_000_000_000), 3_600_000_000);
    }

    #[test]
    fn manual_timebase_steps() {
        let tb = ManualTimebase::new(10, 1_000_000);
        assert_eq!(tb.now(), 0);
        assert_eq!(tb.now(), 10);
        assert_eq!(tb.now(), 20);
    }
}
