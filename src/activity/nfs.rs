//! Parser for the NFS client statistics source
//! (`/proc/self/mountstats` on Linux).
//!
//! The file carries one section per mount, introduced by a
//! `device <name> mounted on <mountpoint> with fstype <type>` header. NFS
//! sections end with per-operation lines of the form
//!
//! ```text
//! READ: <ops> <trans> <timeouts> <bytes> <...> <...> <...> <queue-µs>
//! ```
//!
//! Only the `READ:` and `WRITE:` tags matter here: operation count at
//! field 0, transferred bytes at field 3, cumulative latency in
//! microseconds at field 7. Scanning stops once `WRITE:` has been seen;
//! everything after it is irrelevant.

use std::io::BufRead;

use crate::statistics::IoStatistics;

use super::error::ParseError;

/// Counters extracted from one per-operation line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperationStats {
    pub operations: u64,
    pub bytes: u64,
    pub time_ms: f64,
}

/// READ/WRITE activity for one NFS mount. A direction whose line was
/// absent (or short) stays `None` and simply contributes no update.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NfsActivity {
    pub read: Option<OperationStats>,
    pub write: Option<OperationStats>,
}

/// Scans the statistics source for the section of `device` and extracts
/// its READ/WRITE counters.
///
/// # Returns
///
/// `Ok(None)` when no section for `device` exists (the mount vanished or
/// the kernel has not populated it yet); this is not an error.
///
/// # Errors
///
/// Returns [`ParseError::Io`] if reading the source fails.
pub fn scan<R: BufRead>(buf: &mut R, device: &str) -> Result<Option<NfsActivity>, ParseError> {
    let header = format!("device {device} ");
    let mut found = false;
    let mut activity = NfsActivity::default();

    let mut line = String::new();
    loop {
        line.clear();
        if buf.read_line(&mut line)? == 0 {
            break;
        }
        if !found {
            found = line.starts_with(&header);
            continue;
        }
        if line.starts_with("device ") {
            // Next mount's section: ours had no WRITE line.
            break;
        }
        let Some((tag, counters)) = line.trim_start().split_once(':') else {
            continue;
        };
        match tag {
            "READ" => activity.read = parse_operation(counters),
            "WRITE" => {
                activity.write = parse_operation(counters);
                break;
            }
            _ => {}
        }
    }

    Ok(found.then_some(activity))
}

/// Extracts (operations, bytes, latency) from a per-operation counter
/// list. Lines with fewer than eight fields, or with unparsable fields,
/// yield `None`; the direction is simply not updated this cycle.
fn parse_operation(counters: &str) -> Option<OperationStats> {
    let fields: Vec<&str> = counters.split_whitespace().collect();
    if fields.len() < 8 {
        return None;
    }
    Some(OperationStats {
        operations: fields[0].parse().ok()?,
        bytes: fields[3].parse().ok()?,
        time_ms: super::units::micros_to_millis(fields[7].parse().ok()?),
    })
}

impl NfsActivity {
    /// Feeds whichever directions were present into the accumulators.
    pub fn apply(&self, now: u64, io: &mut IoStatistics) {
        if let Some(read) = self.read {
            io.read.operations.update(now, read.operations as f64);
            io.read.bytes.update(now, read.bytes as f64);
            io.read.time.update(now, read.time_ms);
        }
        if let Some(write) = self.write {
            io.write.operations.update(now, write.operations as f64);
            io.write.bytes.update(now, write.bytes as f64);
            io.write.time.update(now, write.time_ms);
        }
    }
}
