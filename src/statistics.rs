//! Delta/rate accumulator fed by the activity and usage collectors.
//!
//! A [`Statistic`] tracks one raw, monotonically-increasing-until-reset
//! kernel counter. Each poll cycle feeds it the current cumulative value and
//! a millisecond timestamp; the accumulator keeps the previous sample and
//! derives the delta and per-second rate between the two.
//!
//! The accumulator is reset-safe in both directions:
//!
//! - a raw value below the previous sample (counter wrapped or the kernel
//!   reset it) starts a fresh baseline instead of producing a negative delta;
//! - a timestamp below the previous sample (backward clock adjustment)
//!   likewise re-baselines rather than dividing by a negative interval.
//!
//! [`Statistic::reset`] returns to the "no data" state; the first update
//! afterwards only records a baseline and reports a zero delta.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
struct Sample {
    timestamp: u64,
    value: f64,
}

/// A single rate-tracked counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Statistic {
    sample: Option<Sample>,
    delta: f64,
    elapsed_ms: u64,
}

impl Statistic {
    /// Feeds the current cumulative counter value observed at `timestamp`
    /// (milliseconds on a monotonic-enough clock).
    pub fn update(&mut self, timestamp: u64, value: f64) {
        match self.sample {
            Some(previous) if value >= previous.value && timestamp >= previous.timestamp => {
                self.delta = value - previous.value;
                self.elapsed_ms = timestamp - previous.timestamp;
            }
            // Counter reset or backward clock jump: re-baseline.
            _ => {
                self.delta = 0.0;
                self.elapsed_ms = 0;
            }
        }
        self.sample = Some(Sample { timestamp, value });
    }

    /// Clears the accumulator back to the "no data" state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Whether the accumulator holds at least a baseline sample.
    pub fn has_data(&self) -> bool {
        self.sample.is_some()
    }

    /// The most recent raw counter value, if any.
    pub fn raw(&self) -> Option<f64> {
        self.sample.map(|s| s.value)
    }

    /// Raw counter increase between the two most recent updates.
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Rate per second over the most recent update interval, or `0.0` while
    /// only a baseline exists.
    pub fn per_second(&self) -> f64 {
        if self.elapsed_ms > 0 {
            self.delta * 1000.0 / self.elapsed_ms as f64
        } else {
            0.0
        }
    }
}

/// Byte, operation and cumulative-time accumulators for one transfer
/// direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Transfer {
    pub bytes: Statistic,
    pub operations: Statistic,
    pub time: Statistic,
}

impl Transfer {
    fn reset(&mut self) {
        self.bytes.reset();
        self.operations.reset();
        self.time.reset();
    }
}

/// The full set of activity accumulators for one filesystem: the six
/// read/write counters plus the run/wait latency counters on platforms
/// that expose them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct IoStatistics {
    pub read: Transfer,
    pub write: Transfer,
    pub run_time: Statistic,
    pub wait_time: Statistic,
}

impl IoStatistics {
    /// Puts every accumulator into the "no data" state. Required whenever
    /// the device fails to resolve, so a frozen rate is never reported as
    /// live.
    pub fn reset(&mut self) {
        self.read.reset();
        self.write.reset();
        self.run_time.reset();
        self.wait_time.reset();
    }

    /// Whether any accumulator still holds data.
    pub fn has_data(&self) -> bool {
        self.read.bytes.has_data()
            || self.read.operations.has_data()
            || self.read.time.has_data()
            || self.write.bytes.has_data()
            || self.write.operations.has_data()
            || self.write.time.has_data()
            || self.run_time.has_data()
            || self.wait_time.has_data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_statistics_reset_clears_every_counter() {
        let mut io = IoStatistics::default();
        io.read.bytes.update(1_000, 1.0);
        io.write.time.update(1_000, 2.0);
        io.run_time.update(1_000, 3.0);
        assert!(io.has_data());
        io.reset();
        assert!(!io.has_data());
    }

    #[test]
    fn first_update_is_a_baseline() {
        let mut stat = Statistic::default();
        assert!(!stat.has_data());
        stat.update(1_000, 4096.0);
        assert!(stat.has_data());
        assert_eq!(stat.delta(), 0.0);
        assert_eq!(stat.per_second(), 0.0);
    }

    #[test]
    fn rate_over_one_interval() {
        let mut stat = Statistic::default();
        stat.update(1_000, 1000.0);
        stat.update(3_000, 2000.0);
        assert_eq!(stat.delta(), 1000.0);
        assert_eq!(stat.per_second(), 500.0);
    }

    #[test]
    fn counter_reset_rebaselines() {
        let mut stat = Statistic::default();
        stat.update(1_000, 5000.0);
        stat.update(2_000, 100.0);
        assert_eq!(stat.delta(), 0.0);
        assert_eq!(stat.per_second(), 0.0);
        stat.update(3_000, 600.0);
        assert_eq!(stat.delta(), 500.0);
        assert_eq!(stat.per_second(), 500.0);
    }

    #[test]
    fn backward_clock_jump_rebaselines() {
        let mut stat = Statistic::default();
        stat.update(10_000, 100.0);
        stat.update(4_000, 200.0);
        assert_eq!(stat.delta(), 0.0);
        assert_eq!(stat.per_second(), 0.0);
    }

    #[test]
    fn reset_clears_all_state() {
        let mut stat = Statistic::default();
        stat.update(1_000, 100.0);
        stat.update(2_000, 200.0);
        stat.reset();
        assert!(!stat.has_data());
        assert_eq!(stat.raw(), None);
        assert_eq!(stat.delta(), 0.0);
        // The next update after a reset must not see the stale sample.
        stat.update(3_000, 50.0);
        assert_eq!(stat.delta(), 0.0);
    }
}
