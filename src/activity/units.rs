//! Time-unit conversions for the per-platform statistics sources.
//!
//! The sources disagree on units: raw `bintime` fractions on FreeBSD,
//! `timeval` pairs on the other BSDs, nanoseconds from Solaris kstat and
//! Darwin IOKit, microseconds in NFS client statistics, and already
//! milliseconds in the Linux block layer. Every collector converts to
//! milliseconds before feeding an accumulator.

/// Converts a `bintime` (seconds plus a 64-bit binary fraction of a
/// second) to whole milliseconds.
pub fn bintime_to_millis(sec: i64, frac: u64) -> u64 {
    sec as u64 * 1000 + (((frac >> 32) * 1000) >> 32)
}

/// Converts a `timeval` (seconds plus microseconds) to milliseconds.
pub fn timeval_to_millis(sec: i64, usec: i64) -> f64 {
    sec as f64 * 1000.0 + usec as f64 / 1000.0
}

/// Converts nanoseconds to milliseconds.
pub fn nanos_to_millis(ns: i64) -> f64 {
    ns as f64 / 1_000_000.0
}

/// Converts microseconds to milliseconds.
pub fn micros_to_millis(us: u64) -> f64 {
    us as f64 / 1000.0
}
