//! Parser for the CIFS client statistics source
//! (`/proc/fs/cifs/Stats` on Linux).
//!
//! The file lists numbered share blocks:
//!
//! ```text
//! 1) \\server\share
//! SMBs: 744
//! Reads:  727 Bytes: 446098
//! Writes: 14 Bytes: 4096
//! ...
//! ```
//!
//! The share name uses backslash separators; the resolver normalizes the
//! mount source accordingly before lookup. Scanning stops after the
//! `Writes:` line of the matched share.

use std::io::BufRead;

use crate::statistics::IoStatistics;

use super::error::ParseError;

/// Operation and byte counters for one transfer direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpsBytes {
    pub operations: u64,
    pub bytes: u64,
}

/// Read/write activity for one CIFS share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CifsActivity {
    pub read: Option<OpsBytes>,
    pub write: Option<OpsBytes>,
}

/// Scans the statistics source for the numbered entry of `share` and
/// extracts its read/write counters.
///
/// # Returns
///
/// `Ok(None)` when no entry for `share` exists; this is not an error.
///
/// # Errors
///
/// Returns [`ParseError::Io`] if reading the source fails.
pub fn scan<R: BufRead>(buf: &mut R, share: &str) -> Result<Option<CifsActivity>, ParseError> {
    let mut found = false;
    let mut activity = CifsActivity::default();

    let mut line = String::new();
    loop {
        line.clear();
        if buf.read_line(&mut line)? == 0 {
            break;
        }
        if !found {
            found = matches_share_header(&line, share);
            continue;
        }
        if let Some((label, counters)) = parse_ops_bytes(&line) {
            match label {
                "Reads" => activity.read = Some(counters),
                "Writes" => {
                    activity.write = Some(counters);
                    break;
                }
                _ => {}
            }
        }
    }

    Ok(found.then_some(activity))
}

/// Matches a `N) \\server\share` entry header against the share name.
fn matches_share_header(line: &str, share: &str) -> bool {
    let Some((index, rest)) = line.split_once(')') else {
        return false;
    };
    if index.trim().parse::<u64>().is_err() {
        return false;
    }
    rest.split_whitespace().next() == Some(share)
}

/// Parses a `<label>: <operations> Bytes: <bytes>` line.
fn parse_ops_bytes(line: &str) -> Option<(&str, OpsBytes)> {
    let (label, rest) = line.trim().split_once(':')?;
    let mut fields = rest.split_whitespace();
    let operations = fields.next()?.parse().ok()?;
    if fields.next() != Some("Bytes:") {
        return None;
    }
    let bytes = fields.next()?.parse().ok()?;
    Some((label, OpsBytes { operations, bytes }))
}

impl CifsActivity {
    /// Feeds whichever directions were present into the accumulators.
    pub fn apply(&self, now: u64, io: &mut IoStatistics) {
        if let Some(read) = self.read {
            io.read.operations.update(now, read.operations as f64);
            io.read.bytes.update(now, read.bytes as f64);
        }
        if let Some(write) = self.write {
            io.write.operations.update(now, write.operations as f64);
            io.write.bytes.update(now, write.bytes as f64);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATS: &str = "\
Resources in use
CIFS Session: 2
Share (unique mount targets): 2
SMB Request/Response Buffer: 1 Pool size: 5

1) \\\\filer\\backup
SMBs: 12 Oplocks breaks: 0
Reads:  3 Bytes: 96
Writes: 1 Bytes: 32
2) \\\\filer\\media
SMBs: 744 Oplocks breaks: 0
Reads:  727 Bytes: 446098
Writes: 14 Bytes: 4096
";

    #[test]
    fn finds_the_matching_share_entry() {
        let activity = scan(&mut STATS.as_bytes(), "\\\\filer\\media")
            .unwrap()
            .expect("share exists");
        assert_eq!(
            activity.read,
            Some(OpsBytes {
                operations: 727,
                bytes: 446098
            })
        );
        assert_eq!(
            activity.write,
            Some(OpsBytes {
                operations: 14,
                bytes: 4096
            })
        );
    }

    #[test]
    fn does_not_bleed_into_the_next_entry() {
        let activity = scan(&mut STATS.as_bytes(), "\\\\filer\\backup")
            .unwrap()
            .expect("share exists");
        assert_eq!(activity.read.unwrap().bytes, 96);
        assert_eq!(activity.write.unwrap().operations, 1);
    }

    #[test]
    fn missing_share_yields_none() {
        let activity = scan(&mut STATS.as_bytes(), "\\\\filer\\missing").unwrap();
        assert!(activity.is_none());
    }

    #[test]
    fn header_requires_a_numbered_entry() {
        // The preamble line "Share (unique mount targets): 2" contains a
        // parenthesis but is not an entry header.
        assert!(!matches_share_header(
            "Share (unique mount targets): 2\n",
            "(unique"
        ));
        assert!(matches_share_header("1) \\\\a\\b\n", "\\\\a\\b"));
    }
}
