//! Classification of a matched mount entry into its activity-collection
//! strategy, and derivation of the kernel-visible statistics key.
//!
//! The rules apply in priority order on the entry's filesystem-type string:
//! NFS, then CIFS, then ZFS, then known virtual types, and only then a
//! local block device. Block-device keys are platform-flavored: the
//! statistics table may be indexed by partition name, by whole-disk name,
//! or (on Solaris) by driver module and instance number from the
//! instance-mapping table.

use std::path::Path;

use crate::fsutil;

use super::Classification;
use super::error::{Error, Result};
use super::path_to_inst;
use crate::mounttab::{MountEntry, device_minor};

/// Filesystem types with no meaningful device-level I/O counters.
const VIRTUAL_FILESYSTEMS: &[&str] = &[
    "proc", "procfs", "sysfs", "devtmpfs", "devpts", "devfs", "tmpfs", "ramfs", "mqueue",
    "hugetlbfs", "cgroup", "cgroup2", "pstore", "efivarfs", "securityfs", "debugfs", "tracefs",
    "bpf", "configfs", "binfmt_misc", "fusectl", "nsfs", "rpc_pipefs", "autofs", "overlay",
    "squashfs", "fdescfs", "kernfs", "ptyfs", "swap",
];

/// Whether a filesystem type is pseudo/virtual by name. FUSE mounts that
/// are not otherwise specialized also land here.
pub fn is_virtual_type(fstype: &str) -> bool {
    VIRTUAL_FILESYSTEMS.contains(&fstype) || fstype.starts_with("fuse")
}

/// How the platform's statistics table is keyed for local block devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameScheme {
    /// Canonical basename as-is; the table carries per-partition entries.
    Basename,
    /// Driver name plus unit number, partition suffix dropped
    /// (`da0p2` -> `da0`).
    DriverUnit,
    /// Trailing partition letters dropped (`sd0a` -> `sd0`).
    TrailingLetter,
    /// Driver module and instance number resolved through the
    /// instance-mapping table, partition letter appended for drivers that
    /// expose per-partition statistics (`sd0,a`; `cmdk0`).
    InstanceMap,
}

/// Per-platform classification policy: the block-key naming flavor and,
/// where the kernel only keeps statistics for some filesystem types, the
/// allow-list of block-backed types (everything else degrades to Virtual).
#[derive(Debug, Clone, Copy)]
pub struct Policy {
    pub scheme: NameScheme,
    pub block_types: Option<&'static [&'static str]>,
}

#[cfg(target_os = "linux")]
pub(super) const PLATFORM: Policy = Policy {
    scheme: NameScheme::Basename,
    block_types: None,
};

#[cfg(target_os = "freebsd")]
pub(super) const PLATFORM: Policy = Policy {
    scheme: NameScheme::DriverUnit,
    block_types: None,
};

#[cfg(any(target_os = "netbsd", target_os = "openbsd"))]
pub(super) const PLATFORM: Policy = Policy {
    scheme: NameScheme::TrailingLetter,
    block_types: Some(&["ffs"]),
};

#[cfg(target_os = "macos")]
pub(super) const PLATFORM: Policy = Policy {
    scheme: NameScheme::Basename,
    block_types: Some(&["hfs", "apfs"]),
};

#[cfg(any(target_os = "solaris", target_os = "illumos"))]
pub(super) const PLATFORM: Policy = Policy {
    scheme: NameScheme::InstanceMap,
    block_types: None,
};

/// Classifies a matched mount entry under the given policy.
///
/// `root` is the process root prefix, used to locate the instance-mapping
/// table under the [`NameScheme::InstanceMap`] scheme.
///
/// # Errors
///
/// * [`Error::UnresolvableDevice`] — the entry should be block-backed but
///   no statistics key can be derived from its mount source.
/// * [`Error::Canonicalize`] — symlink resolution of the mount source
///   failed for a reason other than the source not existing.
pub fn classification_for(
    entry: &MountEntry,
    root: &Path,
    policy: &Policy,
) -> Result<Classification> {
    if entry.fstype.starts_with("nfs") {
        let key = if policy.scheme == NameScheme::InstanceMap {
            // Kernel NFS statistics are keyed `nfs<minor>`; the minor is
            // carried in the mount options.
            device_minor(&entry.options)
                .map(|minor| format!("nfs{minor}"))
                .unwrap_or_else(|| entry.device.clone())
        } else {
            entry.device.clone()
        };
        return Ok(Classification::Nfs { key });
    }

    if entry.fstype == "cifs" || entry.fstype == "smbfs" {
        return Ok(Classification::Cifs {
            share: cifs_share_key(&entry.device),
        });
    }

    if entry.fstype == "zfs" {
        return Ok(Classification::ZfsPool {
            pool: zfs_pool_name(&entry.device).to_owned(),
        });
    }

    if is_virtual_type(&entry.fstype) {
        return Ok(Classification::Virtual);
    }

    if let Some(block_types) = policy.block_types {
        if !block_types.contains(&entry.fstype.as_str()) {
            // The kernel keeps no usable per-device statistics for this
            // type on this platform.
            return Ok(Classification::Virtual);
        }
    }

    let Some(canonical) = fsutil::canonicalize(&entry.device)? else {
        // The mount source does not name a filesystem object: a virtual
        // mount, not an error.
        return Ok(Classification::Virtual);
    };

    let key = block_key(&canonical, entry, root, policy.scheme)?;
    Ok(Classification::LocalBlock { key })
}

fn block_key(
    canonical: &Path,
    entry: &MountEntry,
    root: &Path,
    scheme: NameScheme,
) -> Result<String> {
    let unresolvable = || Error::UnresolvableDevice {
        device: entry.device.clone(),
    };
    let base = fsutil::base_name(canonical).ok_or_else(unresolvable)?;

    match scheme {
        NameScheme::Basename => Ok(base.to_owned()),
        NameScheme::DriverUnit => {
            let (driver, unit) = split_driver_unit(base).ok_or_else(unresolvable)?;
            Ok(format!("{driver}{unit}"))
        }
        NameScheme::TrailingLetter => {
            Ok(strip_partition_letter(base).ok_or_else(unresolvable)?.to_owned())
        }
        NameScheme::InstanceMap => {
            let canonical = canonical.to_str().ok_or_else(unresolvable)?;
            let (physical, partition) =
                solaris_physical_path(canonical).ok_or_else(unresolvable)?;
            let map_path = root.join("etc/path_to_inst");
            let reader = fsutil::open_file_reader(&map_path)?;
            let (instance, module) = path_to_inst::lookup(reader, physical)
                .map_err(|source| Error::InstanceMapRead {
                    path: map_path,
                    source,
                })?
                .ok_or_else(unresolvable)?;
            if module == "cmdk" {
                // The common disk driver has no per-partition statistics
                // class, only the whole disk.
                Ok(format!("{module}{instance}"))
            } else {
                Ok(format!("{module}{instance},{partition}"))
            }
        }
    }
}

/// Splits a device base name at its first digit into driver name and unit
/// number: `da0p2` -> `("da", 0)`.
pub fn split_driver_unit(base: &str) -> Option<(&str, u32)> {
    let digit = base.find(|c: char| c.is_ascii_digit())?;
    if digit == 0 {
        return None;
    }
    let unit: u32 = base[digit..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .ok()?;
    Some((&base[..digit], unit))
}

/// Drops everything after the last digit of a device base name:
/// `sd0a` -> `sd0`, `wd10e` -> `wd10`.
pub fn strip_partition_letter(base: &str) -> Option<&str> {
    let last_digit = base.rfind(|c: char| c.is_ascii_digit())?;
    Some(&base[..=last_digit])
}

/// Normalizes a CIFS mount source into the share name used by the kernel's
/// statistics table, which spells separators with backslashes:
/// `//server/share` -> `\\server\share`.
pub fn cifs_share_key(device: &str) -> String {
    device.replace('/', "\\")
}

/// The pool a ZFS dataset belongs to: the mount source up to the first
/// `/` (`tank/home` -> `tank`).
pub fn zfs_pool_name(device: &str) -> &str {
    device.split('/').next().unwrap_or(device)
}

/// Splits a canonical Solaris device path into the physical path keyed by
/// the instance-mapping table and the partition letter:
/// `/devices/pci@0,0/pci15ad,1976@10/sd@0,0:a` ->
/// `("/pci@0,0/pci15ad,1976@10/sd@0,0", 'a')`.
pub fn solaris_physical_path(canonical: &str) -> Option<(&str, char)> {
    let rest = canonical.strip_prefix("/devices")?;
    let (path, partition) = rest.rsplit_once(':')?;
    let mut chars = partition.chars();
    let letter = chars.next()?;
    if chars.next().is_some() || path.is_empty() {
        return None;
    }
    Some((path, letter))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(device: &str, fstype: &str, options: &str) -> MountEntry {
        MountEntry {
            device: device.to_owned(),
            mountpoint: "/mnt".to_owned(),
            fstype: fstype.to_owned(),
            options: options.to_owned(),
        }
    }

    const BASENAME: Policy = Policy {
        scheme: NameScheme::Basename,
        block_types: None,
    };

    #[test]
    fn nfs_takes_priority_and_keeps_device_key() {
        let entry = entry("filer:/export", "nfs4", "rw");
        let class = classification_for(&entry, Path::new("/"), &BASENAME).unwrap();
        assert_eq!(
            class,
            Classification::Nfs {
                key: "filer:/export".to_owned()
            }
        );
    }

    #[test]
    fn nfs_key_uses_minor_under_instance_map_scheme() {
        let policy = Policy {
            scheme: NameScheme::InstanceMap,
            block_types: None,
        };
        let entry = entry("filer:/export", "nfs", "rw,dev=4700002");
        let class = classification_for(&entry, Path::new("/"), &policy).unwrap();
        assert_eq!(
            class,
            Classification::Nfs {
                key: "nfs2".to_owned()
            }
        );
    }

    #[test]
    fn cifs_share_separators_are_normalized() {
        let entry = entry("//server/share", "cifs", "rw");
        let class = classification_for(&entry, Path::new("/"), &BASENAME).unwrap();
        assert_eq!(
            class,
            Classification::Cifs {
                share: "\\\\server\\share".to_owned()
            }
        );
    }

    #[test]
    fn zfs_pool_is_device_up_to_first_slash() {
        let entry = entry("tank/home/alice", "zfs", "rw");
        let class = classification_for(&entry, Path::new("/"), &BASENAME).unwrap();
        assert_eq!(
            class,
            Classification::ZfsPool {
                pool: "tank".to_owned()
            }
        );
    }

    #[test]
    fn known_virtual_types_are_virtual() {
        for fstype in ["tmpfs", "proc", "overlay", "fuse.sshfs"] {
            let entry = entry(fstype, fstype, "rw");
            let class = classification_for(&entry, Path::new("/"), &BASENAME).unwrap();
            assert_eq!(class, Classification::Virtual, "type {fstype}");
        }
    }

    #[test]
    fn missing_device_node_is_virtual_not_an_error() {
        let entry = entry("/no/such/device", "ext4", "rw");
        let class = classification_for(&entry, Path::new("/"), &BASENAME).unwrap();
        assert_eq!(class, Classification::Virtual);
    }

    #[test]
    fn block_device_key_follows_symlinks_to_the_basename() {
        let dir = tempfile::tempdir().unwrap();
        let node = dir.path().join("sda1");
        std::fs::write(&node, b"").unwrap();
        let link = dir.path().join("root-volume");
        std::os::unix::fs::symlink(&node, &link).unwrap();

        let entry = entry(link.to_str().unwrap(), "ext4", "rw");
        let class = classification_for(&entry, Path::new("/"), &BASENAME).unwrap();
        assert_eq!(
            class,
            Classification::LocalBlock {
                key: "sda1".to_owned()
            }
        );
    }

    #[test]
    fn block_allow_list_degrades_other_types_to_virtual() {
        let policy = Policy {
            scheme: NameScheme::TrailingLetter,
            block_types: Some(&["ffs"]),
        };
        let entry = entry("/dev/sd0e", "msdos", "rw");
        let class = classification_for(&entry, Path::new("/"), &policy).unwrap();
        assert_eq!(class, Classification::Virtual);
    }

    #[test]
    fn driver_unit_split() {
        assert_eq!(split_driver_unit("da0p2"), Some(("da", 0)));
        assert_eq!(split_driver_unit("ada12s1a"), Some(("ada", 12)));
        assert_eq!(split_driver_unit("nodigits"), None);
        assert_eq!(split_driver_unit("0leading"), None);
    }

    #[test]
    fn partition_letter_strip() {
        assert_eq!(strip_partition_letter("sd0a"), Some("sd0"));
        assert_eq!(strip_partition_letter("wd10"), Some("wd10"));
        assert_eq!(strip_partition_letter("nodigits"), None);
    }

    #[test]
    fn solaris_physical_path_split() {
        assert_eq!(
            solaris_physical_path("/devices/pci@0,0/pci15ad,1976@10/sd@0,0:a"),
            Some(("/pci@0,0/pci15ad,1976@10/sd@0,0", 'a'))
        );
        assert_eq!(solaris_physical_path("/dev/dsk/c0t0d0s0"), None);
    }

    #[test]
    fn solaris_block_key_via_instance_map() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("etc")).unwrap();
        std::fs::write(
            root.path().join("etc/path_to_inst"),
            "#\n# Caution! This file contains critical kernel state\n#\n\
             \"/pci@0,0/pci15ad,1976@10/sd@0,0\" 0 \"sd\"\n\
             \"/pci@0,0/pci-ide@7,1/ide@0/cmdk@0,0\" 3 \"cmdk\"\n",
        )
        .unwrap();

        let sd = block_key(
            Path::new("/devices/pci@0,0/pci15ad,1976@10/sd@0,0:a"),
            &entry("/dev/dsk/c0t0d0s0", "ufs", "rw"),
            root.path(),
            NameScheme::InstanceMap,
        )
        .unwrap();
        assert_eq!(sd, "sd0,a");

        let cmdk = block_key(
            Path::new("/devices/pci@0,0/pci-ide@7,1/ide@0/cmdk@0,0:b"),
            &entry("/dev/dsk/c1d0s1", "ufs", "rw"),
            root.path(),
            NameScheme::InstanceMap,
        )
        .unwrap();
        assert_eq!(cmdk, "cmdk3");
    }
}
