//! Staleness tracking for platform-wide statistics snapshots.
//!
//! Platforms whose kernel reports statistics for all devices in one query
//! (the BSDs) cache the snapshot and refresh it at most once per second,
//! so polling several filesystems in one cycle reuses a single fetch. The
//! staleness check must tolerate backward clock adjustments: a cached
//! timestamp in the future by more than the refresh interval also counts
//! as stale, otherwise a backward jump would freeze the cache.

#[derive(Debug, Clone, Copy)]
pub struct Freshness {
    timestamp: u64,
    interval_ms: u64,
}

impl Freshness {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            timestamp: 0,
            interval_ms,
        }
    }

    /// Whether the cached data is older than the refresh interval, in
    /// either clock direction.
    pub fn is_stale(&self, now: u64) -> bool {
        now > self.timestamp + self.interval_ms || self.timestamp > now + self.interval_ms
    }

    pub fn mark_refreshed(&mut self, now: u64) {
        self.timestamp = now;
    }
}

impl Default for Freshness {
    /// One-second refresh interval, matching the fastest poll cadence.
    fn default() -> Self {
        Self::new(1000)
    }
}
