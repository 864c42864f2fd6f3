//! Parser for the Linux per-block-device statistics pseudo-file
//! (`/sys/class/block/<name>/stat`).
//!
//! The file is a single line of whitespace-separated counters in a fixed,
//! kernel-defined order:
//!
//! ```text
//! read I/Os  read merges  read sectors  read ticks
//! write I/Os write merges write sectors write ticks
//! in_flight  io_ticks     time_in_queue [discard fields...]
//! ```
//!
//! Sector counts are in 512-byte units regardless of the device's logical
//! block size; tick counters are already milliseconds.

use std::io::BufRead;

use crate::statistics::IoStatistics;

use super::error::ParseError;

/// Fixed sector size the kernel uses for the sector counters.
pub const SECTOR_SIZE: u64 = 512;

/// One snapshot of a block device's cumulative I/O counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockDeviceStat {
    pub read_operations: u64,
    pub read_sectors: u64,
    pub read_time_ms: u64,
    pub write_operations: u64,
    pub write_sectors: u64,
    pub write_time_ms: u64,
}

impl BlockDeviceStat {
    /// Parses the statistics line from `buf`.
    ///
    /// # Errors
    ///
    /// * [`ParseError::UnexpectedEof`] — no statistics line present.
    /// * [`ParseError::TruncatedLine`] — fewer than the eight leading
    ///   fields (older kernels always emit eleven; newer append discard
    ///   and flush counters, which are ignored).
    /// * [`ParseError::InvalidValue`] — a counter failed to parse.
    pub fn from_reader<R: BufRead>(buf: &mut R) -> Result<Self, ParseError> {
        let mut line = String::new();
        if buf.read_line(&mut line)? == 0 {
            return Err(ParseError::UnexpectedEof);
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 8 {
            return Err(ParseError::TruncatedLine {
                expected: 8,
                found: fields.len(),
            });
        }

        let counter = |index: usize| -> Result<u64, ParseError> {
            fields[index]
                .parse()
                .map_err(|source| ParseError::InvalidValue {
                    value: fields[index].to_owned(),
                    line: 1,
                    source,
                })
        };

        Ok(Self {
            read_operations: counter(0)?,
            read_sectors: counter(2)?,
            read_time_ms: counter(3)?,
            write_operations: counter(4)?,
            write_sectors: counter(6)?,
            write_time_ms: counter(7)?,
        })
    }

    /// Feeds the snapshot into the accumulators, converting sectors to
    /// bytes.
    pub fn apply(&self, now: u64, io: &mut IoStatistics) {
        io.read.operations.update(now, self.read_operations as f64);
        io.read
            .bytes
            .update(now, (self.read_sectors * SECTOR_SIZE) as f64);
        io.read.time.update(now, self.read_time_ms as f64);
        io.write.operations.update(now, self.write_operations as f64);
        io.write
            .bytes
            .update(now, (self.write_sectors * SECTOR_SIZE) as f64);
        io.write.time.update(now, self.write_time_ms as f64);
    }
}
