//! Linux mount-table source: the mtab-format pseudo-file
//! `/proc/self/mounts`, read in full whenever the change detector reports a
//! new generation.

use std::io::BufRead;
use std::path::Path;

use crate::fsutil;

use super::super::change::{ChangeDetector, Mode};
use super::super::error::{Error, Result};
use super::super::{MountEntry, parser};

/// Mount table pseudo-file, relative to the process root.
pub const MOUNT_SOURCE: &str = "proc/self/mounts";

/// Reads and parses the current mount table.
///
/// # Errors
///
/// Propagates open, read and parse failures; the caller treats them as
/// environmental (the filesystem counts as unmounted for this cycle).
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
        let parsed = parser::parse_mtab_line(&line).map_err(|source| Error::Parse {
            path: path.clone(),
            source,
        })?;
        if let Some(entry) = parsed {
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// Picks the change-detection strategy for this invocation mode.
///
/// A daemon keeps a notification descriptor open on the mount table and
/// polls it for the priority edge the kernel raises on mount changes; a
/// one-shot invocation simply rescans.
pub fn change_detector(root: &Path, mode: Mode) -> ChangeDetector {
    match mode {
        Mode::Daemon => ChangeDetector::notify(root.join(MOUNT_SOURCE)),
        Mode::Once => ChangeDetector::always(),
    }
}
