//! Solaris mount-table source: the `/etc/mnttab` kernel-maintained table,
//! tab-separated, with the mount's device id carried in the `dev=` option.

use std::io::BufRead;
use std::path::Path;

use crate::fsutil;

use super::super::change::{ChangeDetector, Mode};
use super::super::error::{Error, Result};
use super::super::{MountEntry, parser};

/// Mount table file, relative to the process root.
pub const MOUNT_SOURCE: &str = "etc/mnttab";

/// Reads and parses the current mount table.
///
/// # Errors
///
/// Propagates open, read and parse failures.
pub fn read_mount_table(root: &Path) -> Result<Vec<MountEntry>> {
    let path = root.join(MOUNT_SOURCE);
    let mut reader = fsutil::open_file_reader(&path)?;

    let mut entries = Vec::new();
    let mut line = String::new();
    loop {
        line.clear();
        let n = reader.read_line(&mut line).map_err(|source| Error::ReadLine {
            path: path.clone(),
            source,
        })?;
        if n == 0 {
            break;
        }
        let parsed = parser::parse_mnttab_line(&line).map_err(|source| Error::Parse {
            path: path.clone(),
            source,
        })?;
        if let Some(entry) = parsed {
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// The kernel updates the table file's timestamp on every mount change, so
/// a daemon compares timestamps; a one-shot invocation rescans.
pub fn change_detector(root: &Path, mode: Mode) -> ChangeDetector {
    match mode {
        Mode::Daemon => ChangeDetector::timestamp(root.join(MOUNT_SOURCE)),
        Mode::Once => ChangeDetector::always(),
    }
}
