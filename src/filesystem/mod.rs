//! Poll-cycle orchestration: one monitored filesystem, one cycle.
//!
//! Control flow per cycle, per filesystem: the change detector decides
//! whether the cached [`DeviceHandle`] is stale; if so, the mount table is
//! re-read and the target re-resolved and re-classified. Usage collection
//! always runs on a resolved handle; activity collection runs with the
//! strategy pinned to the handle's classification. A resolution failure
//! resets every activity accumulator before returning, so a frozen rate is
//! never reported as live.
//!
//! All cross-cycle platform state (the generation counter, the
//! notification descriptor, any cached statistics snapshot) lives in the
//! explicit [`Platform`] context owned by the polling loop; nothing hides
//! in globals.

mod error;

pub use error::{Error, Result};

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::activity::{self, ActivityCache};
use crate::device::{self, DeviceHandle, MatchBy};
use crate::mounttab::{self, ChangeDetector, Mode, MountTableSnapshot};
use crate::statistics::IoStatistics;
use crate::usage::{self, Usage};

/// Platform context for the polling loop: the process root prefix, the
/// mount-table change detector (and its generation counter), and the
/// platform's activity snapshot cache. Created once at startup, torn down
/// with the loop; long-lived descriptors close on drop.
#[derive(Debug)]
pub struct Platform {
    root: PathBuf,
    detector: ChangeDetector,
    activity_cache: ActivityCache,
}

impl Platform {
    /// Context rooted at `/`, with the platform-default change detection
    /// strategy for `mode`.
    pub fn new(mode: Mode) -> Self {
        Self::with_root("/", mode)
    }

    /// Context rooted at an alternate prefix (a host root bind-mount, a
    /// test tree).
    pub fn with_root(root: impl Into<PathBuf>, mode: Mode) -> Self {
        let root = root.into();
        let detector = mounttab::change_detector(&root, mode);
        Self {
            root,
            detector,
            activity_cache: ActivityCache::default(),
        }
    }

    /// Context with an explicit change detector instead of the platform
    /// default.
    pub fn with_detector(root: impl Into<PathBuf>, detector: ChangeDetector) -> Self {
        Self {
            root: root.into(),
            detector,
            activity_cache: ActivityCache::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn snapshot(&mut self) -> mounttab::Result<MountTableSnapshot> {
        let entries = mounttab::read_mount_table(&self.root)?;
        Ok(MountTableSnapshot::new(entries, self.detector.current()))
    }
}

/// Per-filesystem data sink, owned by the caller and written into every
/// poll cycle. Carries the usage fields, the activity accumulators, and
/// the cached device resolution.
#[derive(Debug, Default, Serialize)]
pub struct FilesystemInfo {
    pub usage: Usage,
    pub io: IoStatistics,
    handle: Option<DeviceHandle>,
}

impl FilesystemInfo {
    /// The cached device resolution, if any cycle has produced one.
    pub fn handle(&self) -> Option<&DeviceHandle> {
        self.handle.as_ref()
    }

    /// Whether the last cycle found the filesystem mounted.
    pub fn is_mounted(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| handle.mounted)
    }
}

/// Runs one poll cycle for the filesystem mounted at `target`.
///
/// # Errors
///
/// See [`collect`].
pub fn collect_by_mountpoint(
    platform: &mut Platform,
    info: &mut FilesystemInfo,
    target: &str,
) -> Result<()> {
    collect(platform, info, target, MatchBy::Mountpoint)
}

/// Runs one poll cycle for the filesystem whose mount source is `target`,
/// allowing for symlink indirection on either side.
///
/// # Errors
///
/// See [`collect`].
pub fn collect_by_device(
    platform: &mut Platform,
    info: &mut FilesystemInfo,
    target: &str,
) -> Result<()> {
    collect(platform, info, target, MatchBy::Device)
}

/// One poll cycle: staleness check, (re-)resolution, usage, activity.
///
/// # Errors
///
/// * [`Error::NotMounted`] — transient; counters were reset and the handle
///   marked unmounted before returning.
/// * Environmental errors from the mount table, resolver, usage or
/// activity stages. A usage failure short-circuits activity collection
/// for the cycle. Counters are reset on mount-table and resolution
/// failures.
pub fn collect(
    platform: &mut Platform,
    info: &mut FilesystemInfo,
    target: &str,
    match_by: MatchBy,
) -> Result<()> {
    let generation = platform.detector.poll_generation();
    let stale = !info
        .handle
        .as_ref()
        .is_some_and(|handle| handle.mounted && handle.generation == generation);

    if stale {
        match refresh_handle(platform, target, match_by) {
            Ok(handle) => info.handle = Some(handle),
            Err(err) => {
                info.io.reset();
                if let Some(handle) = &mut info.handle {
                    handle.mounted = false;
                }
                return Err(err);
            }
        }
    }

    let handle = info
        .handle
        .as_ref()
        .expect("handle is resolved on this or an earlier cycle");
    usage::collect(&handle.mountpoint, &mut info.usage)?;
    activity::collect(
        handle,
        &platform.root,
        &mut platform.activity_cache,
        clock_millis(),
        &mut info.io,
    )?;
    Ok(())
}

fn refresh_handle(
    platform: &mut Platform,
    target: &str,
    match_by: MatchBy,
) -> Result<DeviceHandle> {
    let snapshot = platform.snapshot()?;
    device::resolve(&snapshot, target, match_by, &platform.root).map_err(|err| match err {
        device::Error::NotFound { target } => Error::NotMounted { target },
        other => Error::Resolve(other),
    })
}

/// Wall-clock milliseconds for the accumulator timestamps. The
/// accumulators re-baseline on backward jumps, so a stepped clock degrades
/// one sample instead of producing negative rates.
fn clock_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;
    use crate::device::Classification;
    use std::path::Path;
    use std::time::{Duration, SystemTime};

    /// Builds a fake root with a block device node, its statistics file,
    /// and a data directory serving as the mountpoint.
    struct FakeRoot {
        dir: tempfile::TempDir,
        mountpoint: String,
    }

    impl FakeRoot {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path();
            std::fs::create_dir_all(root.join("proc/self")).unwrap();
            std::fs::create_dir_all(root.join("dev")).unwrap();
            std::fs::write(root.join("dev/sda1"), b"").unwrap();
            let stat_dir = root.join("sys/class/block/sda1");
            std::fs::create_dir_all(&stat_dir).unwrap();
            std::fs::write(stat_dir.join("stat"), "10 0 100 5 20 0 200 7 0 0 0\n").unwrap();
            let mountpoint = root.join("data");
            std::fs::create_dir_all(&mountpoint).unwrap();
            let mountpoint = mountpoint.to_str().unwrap().to_owned();
            let fake = Self { dir, mountpoint };
            fake.write_mounts(&fake.block_entry());
            fake
        }

        fn root(&self) -> &Path {
            self.dir.path()
        }

        fn block_entry(&self) -> String {
            format!(
                "{} {} ext4 rw 0 0\n",
                self.root().join("dev/sda1").display(),
                self.mountpoint
            )
        }

        fn write_mounts(&self, content: &str) {
            std::fs::write(self.mounts_path(), content).unwrap();
        }

        fn mounts_path(&self) -> PathBuf {
            self.root().join("proc/self/mounts")
        }

        fn touch_mounts(&self, offset_secs: u64) {
            let file = std::fs::File::options()
                .append(true)
                .open(self.mounts_path())
                .unwrap();
            file.set_modified(SystemTime::now() + Duration::from_secs(offset_secs))
                .unwrap();
        }

        fn platform(&self) -> Platform {
            Platform::with_detector(
                self.root(),
                ChangeDetector::timestamp(self.mounts_path()),
            )
        }
    }

    #[test]
    fn full_cycle_collects_usage_and_activity() {
        let fake = FakeRoot::new();
        let mut platform = fake.platform();
        let mut info = FilesystemInfo::default();

        collect_by_mountpoint(&mut platform, &mut info, &fake.mountpoint).unwrap();

        assert!(info.is_mounted());
        assert!(info.usage.block_size > 0);
        assert_eq!(info.io.read.bytes.raw(), Some(51200.0));
        assert_eq!(info.io.write.operations.raw(), Some(20.0));
        let handle = info.handle().unwrap();
        assert_eq!(
            handle.classification,
            Classification::LocalBlock {
                key: "sda1".to_owned()
            }
        );
        assert_eq!(handle.fstype, "ext4");
    }

    #[test]
    fn repeated_resolution_without_change_is_idempotent() {
        let fake = FakeRoot::new();
        let mut platform = fake.platform();
        let mut info = FilesystemInfo::default();

        collect_by_mountpoint(&mut platform, &mut info, &fake.mountpoint).unwrap();
        let first = info.handle().unwrap().clone();
        collect_by_mountpoint(&mut platform, &mut info, &fake.mountpoint).unwrap();
        let second = info.handle().unwrap();

        assert_eq!(first.classification, second.classification);
        assert_eq!(first.generation, second.generation);
        assert_eq!(first.device, second.device);
    }

    #[test]
    fn missing_target_resets_counters_and_unmounts() {
        let fake = FakeRoot::new();
        let mut platform = fake.platform();
        let mut info = FilesystemInfo::default();

        collect_by_mountpoint(&mut platform, &mut info, &fake.mountpoint).unwrap();
        assert!(info.io.has_data());

        fake.write_mounts("tmpfs /tmp tmpfs rw 0 0\n");
        fake.touch_mounts(5);

        let err =
            collect_by_mountpoint(&mut platform, &mut info, &fake.mountpoint).unwrap_err();
        assert!(matches!(err, Error::NotMounted { .. }));
        assert!(err.is_transient());
        assert!(!info.is_mounted());
        assert!(!info.io.has_data());
    }

    #[test]
    fn table_change_forces_reclassification() {
        let fake = FakeRoot::new();
        let mut platform = fake.platform();
        let mut info = FilesystemInfo::default();

        collect_by_mountpoint(&mut platform, &mut info, &fake.mountpoint).unwrap();
        let old_generation = info.handle().unwrap().generation;

        // Same mountpoint, now a tmpfs: the change signal must force the
        // classification over to Virtual even though the target matches.
        fake.write_mounts(&format!("tmpfs {} tmpfs rw 0 0\n", fake.mountpoint));
        fake.touch_mounts(5);

        collect_by_mountpoint(&mut platform, &mut info, &fake.mountpoint).unwrap();
        let handle = info.handle().unwrap();
        assert_eq!(handle.classification, Classification::Virtual);
        assert!(handle.generation > old_generation);
    }

    #[test]
    fn remount_after_miss_starts_a_fresh_baseline() {
        let fake = FakeRoot::new();
        let mut platform = fake.platform();
        let mut info = FilesystemInfo::default();

        collect_by_mountpoint(&mut platform, &mut info, &fake.mountpoint).unwrap();

        fake.write_mounts("tmpfs /tmp tmpfs rw 0 0\n");
        fake.touch_mounts(5);
        collect_by_mountpoint(&mut platform, &mut info, &fake.mountpoint).unwrap_err();

        fake.write_mounts(&fake.block_entry());
        fake.touch_mounts(10);
        collect_by_mountpoint(&mut platform, &mut info, &fake.mountpoint).unwrap();

        assert!(info.is_mounted());
        // Post-reset baseline: data present again, but no delta yet.
        assert!(info.io.read.bytes.has_data());
        assert_eq!(info.io.read.bytes.delta(), 0.0);
    }

    #[test]
    fn unreadable_mount_table_is_environmental_and_resets() {
        let fake = FakeRoot::new();
        let mut platform = fake.platform();
        let mut info = FilesystemInfo::default();

        collect_by_mountpoint(&mut platform, &mut info, &fake.mountpoint).unwrap();
        assert!(info.io.has_data());

        std::fs::remove_file(fake.mounts_path()).unwrap();
        let err =
            collect_by_mountpoint(&mut platform, &mut info, &fake.mountpoint).unwrap_err();
        assert!(matches!(err, Error::MountTable(_)));
        assert!(!err.is_transient());
        assert!(!info.io.has_data());
        assert!(!info.is_mounted());
    }

    #[test]
    fn collect_by_device_matches_through_symlinks() {
        let fake = FakeRoot::new();
        let link = fake.root().join("dev/root-volume");
        std::os::unix::fs::symlink(fake.root().join("dev/sda1"), &link).unwrap();

        let mut platform = fake.platform();
        let mut info = FilesystemInfo::default();
        collect_by_device(&mut platform, &mut info, link.to_str().unwrap()).unwrap();
        assert_eq!(info.handle().unwrap().mountpoint, fake.mountpoint);
    }
}
