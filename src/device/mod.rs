//! Device resolution: mapping a monitored target (mountpoint or device
//! path) to the kernel device behind it.
//!
//! Resolution scans a [`MountTableSnapshot`], matches the target by exact
//! mountpoint equality or by device identity (exact first, then through
//! symlink-following canonicalization, since device-mapper, LVM and `by-id`
//! paths are symlinks to the canonical node), and classifies the matched
//! entry into the activity-collection strategy for its filesystem type.
//! The result is a [`DeviceHandle`], cached by the caller across poll
//! cycles and invalidated when the mount-table generation advances.

mod classify;
mod error;
mod path_to_inst;

pub use classify::{
    NameScheme, Policy, cifs_share_key, classification_for, is_virtual_type,
    solaris_physical_path, split_driver_unit, strip_partition_letter, zfs_pool_name,
};
pub use error::{Error, Result};
pub use path_to_inst::lookup as instance_lookup;

use std::path::Path;

use serde::Serialize;

use crate::fsutil;
use crate::mounttab::{MountEntry, MountTableSnapshot};

/// Activity-collection strategy for a resolved filesystem, carrying the
/// classification-specific statistics lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Classification {
    /// A real block device; `key` names its entry in the platform's
    /// per-device statistics table.
    LocalBlock { key: String },
    /// An NFS client mount; `key` names its section in the client
    /// statistics source.
    Nfs { key: String },
    /// A CIFS share; `share` is the backslash-normalized share name.
    Cifs { share: String },
    /// A ZFS dataset; `pool` is its pool.
    ZfsPool { pool: String },
    /// No meaningful device-level I/O counters exist; activity collection
    /// is a successful no-op.
    Virtual,
}

/// Per-filesystem resolved identity, cached across poll cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceHandle {
    /// Raw mount source string.
    pub device: String,
    /// Mountpoint the entry was matched at.
    pub mountpoint: String,
    /// Filesystem type tag.
    pub fstype: String,
    /// Activity strategy and lookup key.
    pub classification: Classification,
    /// Mount-table generation this handle was resolved against; the handle
    /// is stale iff it differs from the detector's current generation.
    pub generation: u64,
    /// Cleared when the target later fails to resolve.
    pub mounted: bool,
}

/// How a monitored target names its filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchBy {
    Mountpoint,
    Device,
}

/// Resolves `target` against a mount-table snapshot.
///
/// First match wins; table order is whatever the platform returned.
/// `root` is the process root prefix for auxiliary lookups.
///
/// # Errors
///
/// * [`Error::NotFound`] — no entry matches; expected transiently during
///   mount/unmount races. The caller resets the target's counters.
/// * Classification errors per [`classification_for`].
pub fn resolve(
    table: &MountTableSnapshot,
    target: &str,
    match_by: MatchBy,
    root: &Path,
) -> Result<DeviceHandle> {
    let entry = find_entry(table.entries(), target, match_by)?.ok_or_else(|| Error::NotFound {
        target: target.to_owned(),
    })?;

    let classification = classification_for(entry, root, &classify::PLATFORM)?;
    Ok(DeviceHandle {
        device: entry.device.clone(),
        mountpoint: entry.mountpoint.clone(),
        fstype: entry.fstype.clone(),
        classification,
        generation: table.generation(),
        mounted: true,
    })
}

fn find_entry<'t>(
    entries: &'t [MountEntry],
    target: &str,
    match_by: MatchBy,
) -> Result<Option<&'t MountEntry>> {
    match match_by {
        MatchBy::Mountpoint => Ok(entries
            .iter()
            // The rootfs pseudo-device shadows the real root mount.
            .find(|entry| entry.mountpoint == target && entry.device != "rootfs")),
        MatchBy::Device => {
            if let Some(entry) = entries.iter().find(|entry| entry.device == target) {
                return Ok(Some(entry));
            }
            // Two-stage equality: no exact match, so compare both sides in
            // canonical form.
            let Some(canonical_target) = fsutil::canonicalize(target)? else {
                return Ok(None);
            };
            for entry in entries {
                if let Some(canonical_device) = fsutil::canonicalize(&entry.device)? {
                    if canonical_device == canonical_target {
                        return Ok(Some(entry));
                    }
                }
            }
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: Vec<MountEntry>) -> MountTableSnapshot {
        MountTableSnapshot::new(entries, 3)
    }

    fn entry(device: &str, mountpoint: &str, fstype: &str) -> MountEntry {
        MountEntry {
            device: device.to_owned(),
            mountpoint: mountpoint.to_owned(),
            fstype: fstype.to_owned(),
            options: "rw".to_owned(),
        }
    }

    #[test]
    fn resolves_mountpoint_to_classified_handle() {
        let table = table(vec![
            entry("tmpfs", "/tmp", "tmpfs"),
            entry("filer:/export", "/mnt/nfs", "nfs4"),
        ]);
        let handle = resolve(&table, "/mnt/nfs", MatchBy::Mountpoint, Path::new("/")).unwrap();
        assert_eq!(handle.device, "filer:/export");
        assert_eq!(handle.fstype, "nfs4");
        assert_eq!(handle.generation, 3);
        assert!(handle.mounted);
        assert_eq!(
            handle.classification,
            Classification::Nfs {
                key: "filer:/export".to_owned()
            }
        );
    }

    #[test]
    fn missing_target_is_not_found() {
        let table = table(vec![entry("tmpfs", "/tmp", "tmpfs")]);
        let err = resolve(&table, "/data", MatchBy::Mountpoint, Path::new("/")).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn rootfs_pseudo_device_is_skipped() {
        let table = table(vec![
            entry("rootfs", "/", "rootfs"),
            entry("tmpfs", "/", "tmpfs"),
        ]);
        let handle = resolve(&table, "/", MatchBy::Mountpoint, Path::new("/")).unwrap();
        assert_eq!(handle.device, "tmpfs");
    }

    #[test]
    fn first_match_wins_in_table_order() {
        let table = table(vec![
            entry("tmpfs", "/mnt", "tmpfs"),
            entry("filer:/export", "/mnt", "nfs"),
        ]);
        let handle = resolve(&table, "/mnt", MatchBy::Mountpoint, Path::new("/")).unwrap();
        assert_eq!(handle.classification, Classification::Virtual);
    }

    #[test]
    fn device_match_exact_then_canonical() {
        let dir = tempfile::tempdir().unwrap();
        let node = dir.path().join("sdb2");
        std::fs::write(&node, b"").unwrap();
        let link = dir.path().join("by-id-link");
        std::os::unix::fs::symlink(&node, &link).unwrap();

        let table = table(vec![entry(link.to_str().unwrap(), "/data", "ext4")]);

        // Exact string match.
        let handle = resolve(
            &table,
            link.to_str().unwrap(),
            MatchBy::Device,
            Path::new("/"),
        )
        .unwrap();
        assert_eq!(handle.mountpoint, "/data");

        // Symlink indirection: the target names the canonical node, the
        // table carries the link.
        let handle = resolve(
            &table,
            node.to_str().unwrap(),
            MatchBy::Device,
            Path::new("/"),
        )
        .unwrap();
        assert_eq!(handle.mountpoint, "/data");
        assert_eq!(
            handle.classification,
            Classification::LocalBlock {
                key: "sdb2".to_owned()
            }
        );
    }

    #[test]
    fn unresolvable_device_target_is_not_found() {
        let table = table(vec![entry("/dev/sdz9", "/data", "ext4")]);
        let err = resolve(
            &table,
            "/no/such/node",
            MatchBy::Device,
            Path::new("/"),
        )
        .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }
}
