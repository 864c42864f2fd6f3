//! Parser for the ZFS pool I/O statistics kstat
//! (`/proc/spl/kstat/zfs/<pool>/io` on Linux).
//!
//! The kstat is a three-line table: a kstat header, a row of column names,
//! and a row of values:
//!
//! ```text
//! 11 1 0x01 12 336 8577226765 427769845563
//! nread    nwritten reads    writes   wtime    wlentime wupdate  ...
//! 3089408  58368    507      49       122512   373322   86529874 ...
//! ```
//!
//! Columns are mapped by header name, not position. A pool whose kstat is
//! absent (momentarily, or permanently on kernels that dropped it) is a
//! soft condition: classification stands and the cycle simply carries no
//! update.

use std::io::BufRead;

use crate::statistics::IoStatistics;

use super::error::ParseError;

/// Byte and operation counters for one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolIo {
    pub nread: u64,
    pub nwritten: u64,
    pub reads: u64,
    pub writes: u64,
}

/// Parses the pool I/O kstat.
///
/// # Returns
///
/// `Ok(None)` when the table is incomplete (header without values), the
/// soft "stats absent" condition.
///
/// # Errors
///
/// * [`ParseError::InvalidValue`] — a named column failed to parse.
/// * [`ParseError::Io`] — reading the source failed.
pub fn from_reader<R: BufRead>(buf: &mut R) -> Result<Option<PoolIo>, ParseError> {
    let mut header = String::new();
    let mut names = String::new();
    let mut values = String::new();
    if buf.read_line(&mut header)? == 0
        || buf.read_line(&mut names)? == 0
        || buf.read_line(&mut values)? == 0
    {
        return Ok(None);
    }

    let mut pool = PoolIo::default();
    for (name, value) in names.split_whitespace().zip(values.split_whitespace()) {
        let slot = match name {
            "nread" => &mut pool.nread,
            "nwritten" => &mut pool.nwritten,
            "reads" => &mut pool.reads,
            "writes" => &mut pool.writes,
            _ => continue,
        };
        *slot = value.parse().map_err(|source| ParseError::InvalidValue {
            value: value.to_owned(),
            line: 3,
            source,
        })?;
    }
    Ok(Some(pool))
}

impl PoolIo {
    pub fn apply(&self, now: u64, io: &mut IoStatistics) {
        io.read.bytes.update(now, self.nread as f64);
        io.write.bytes.update(now, self.nwritten as f64);
        io.read.operations.update(now, self.reads as f64);
        io.write.operations.update(now, self.writes as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KSTAT: &str = "\
11 1 0x01 12 336 8577226765 427769845563
nread    nwritten reads    writes   wtime    wlentime wupdate  rtime    rlentime rupdate  wcnt     rcnt
3089408  58368    507      49       122512   373322   86529874 1065545  2579445  86529874 0        0
";

    #[test]
    fn maps_columns_by_name() {
        let pool = from_reader(&mut KSTAT.as_bytes()).unwrap().unwrap();
        assert_eq!(
            pool,
            PoolIo {
                nread: 3089408,
                nwritten: 58368,
                reads: 507,
                writes: 49,
            }
        );
    }

    #[test]
    fn reordered_columns_still_map() {
        let data = "\
11 1 0x01 4 112 0 0
writes reads nwritten nread
1 2 3 4
";
        let pool = from_reader(&mut data.as_bytes()).unwrap().unwrap();
        assert_eq!(
            pool,
            PoolIo {
                nread: 4,
                nwritten: 3,
                reads: 2,
                writes: 1,
            }
        );
    }

    #[test]
    fn incomplete_table_is_soft_absent() {
        assert!(from_reader(&mut "".as_bytes()).unwrap().is_none());
        let headers_only = "11 1 0x01 12 336 0 0\nnread nwritten\n";
        assert!(from_reader(&mut headers_only.as_bytes()).unwrap().is_none());
    }

    #[test]
    fn invalid_counter_is_rejected() {
        let data = "h\nnread\nxyz\n";
        let err = from_reader(&mut data.as_bytes()).unwrap_err();
        assert!(matches!(err, ParseError::InvalidValue { .. }));
    }
}
