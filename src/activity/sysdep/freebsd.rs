//! FreeBSD activity collection: the `kern.devstat.all` sysctl, which
//! returns a generation number followed by one `struct devstat` per
//! device. The snapshot covers every device at once, so it is cached and
//! refreshed at most once per second.

use std::ffi::CStr;
use std::io;
use std::path::Path;

use crate::mounttab::fetch_sized;
use crate::statistics::IoStatistics;

use super::super::cache::Freshness;
use super::super::error::{Error, Result};
use super::super::units::bintime_to_millis;
use crate::device::split_driver_unit;

mod ffi {
    use libc::{c_char, c_int, c_uint, c_void};

    pub const DEVSTAT_NAME_LEN: usize = 16;
    pub const DEVSTAT_N_TRANS_FLAGS: usize = 4;
    pub const DEVSTAT_READ: usize = 1;
    pub const DEVSTAT_WRITE: usize = 2;

    #[repr(C)]
    #[derive(Clone, Copy)]
    pub struct bintime {
        pub sec: libc::time_t,
        pub frac: u64,
    }

    #[repr(C)]
    #[derive(Clone, Copy)]
    pub struct devstat {
        pub sequence0: c_uint,
        pub allocated: c_int,
        pub start_count: c_uint,
        pub end_count: c_uint,
        pub busy_from: bintime,
        pub dev_links: *mut c_void,
        pub device_number: u32,
        pub device_name: [c_char; DEVSTAT_NAME_LEN],
        pub unit_number: c_int,
        pub bytes: [u64; DEVSTAT_N_TRANS_FLAGS],
        pub operations: [u64; DEVSTAT_N_TRANS_FLAGS],
        pub duration: [bintime; DEVSTAT_N_TRANS_FLAGS],
        pub busy_time: bintime,
        pub creation_time: bintime,
        pub block_size: u32,
        pub tag_types: [u64; 3],
        pub flags: u32,
        pub device_type: u32,
        pub priority: u32,
        pub id: *const c_void,
        pub sequence1: c_uint,
    }
}

/// Cached whole-system device statistics snapshot.
#[derive(Default)]
pub struct ActivityCache {
    freshness: Freshness,
    devices: Vec<ffi::devstat>,
}

impl std::fmt::Debug for ActivityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityCache")
            .field("devices", &self.devices.len())
            .finish()
    }
}

fn sysctl_len(name: &CStr) -> io::Result<usize> {
    let mut len: libc::size_t = 0;
    let rc = unsafe {
        libc::sysctlbyname(
            name.as_ptr(),
            std::ptr::null_mut(),
            &mut len,
            std::ptr::null_mut(),
            0,
        )
    };
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(len)
    }
}

fn devstat_snapshot() -> io::Result<Vec<ffi::devstat>> {
    let name = c"kern.devstat.all";
    let raw: Vec<u8> = fetch_sized(
        0u8,
        || sysctl_len(name),
        |buf| {
            let mut len: libc::size_t = buf.len();
            let rc = unsafe {
                libc::sysctlbyname(
                    name.as_ptr(),
                    buf.as_mut_ptr().cast(),
                    &mut len,
                    std::ptr::null_mut(),
                    0,
                )
            };
            if rc < 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok(len)
            }
        },
    )?;

    // The buffer leads with the devstat generation number.
    let offset = std::mem::size_of::<libc::c_long>();
    let stride = std::mem::size_of::<ffi::devstat>();
    let mut devices = Vec::with_capacity(raw.len().saturating_sub(offset) / stride);
    let mut cursor = offset;
    while cursor + stride <= raw.len() {
        let device =
            unsafe { std::ptr::read_unaligned(raw.as_ptr().add(cursor).cast::<ffi::devstat>()) };
        devices.push(device);
        cursor += stride;
    }
    Ok(devices)
}

impl ActivityCache {
    fn refresh(&mut self, now: u64) -> Result<()> {
        if self.freshness.is_stale(now) {
            self.devices = devstat_snapshot().map_err(|source| Error::Syscall { source })?;
            self.freshness.mark_refreshed(now);
        }
        Ok(())
    }
}

fn device_name(stat: &ffi::devstat) -> &str {
    unsafe { CStr::from_ptr(stat.device_name.as_ptr()) }
        .to_str()
        .unwrap_or("")
}

pub(in super::super) fn block(
    key: &str,
    _mountpoint: &str,
    _root: &Path,
    cache: &mut ActivityCache,
    now: u64,
    io: &mut IoStatistics,
) -> Result<()> {
    let Some((driver, unit)) = split_driver_unit(key) else {
        log::debug!("unrecognized device key `{key}`");
        return Ok(());
    };
    cache.refresh(now)?;

    if let Some(stat) = cache
        .devices
        .iter()
        .find(|stat| stat.unit_number == unit as libc::c_int && device_name(stat) == driver)
    {
        io.read
            .bytes
            .update(now, stat.bytes[ffi::DEVSTAT_READ] as f64);
        io.read
            .operations
            .update(now, stat.operations[ffi::DEVSTAT_READ] as f64);
        io.read.time.update(
            now,
            bintime_to_millis(
                stat.duration[ffi::DEVSTAT_READ].sec,
                stat.duration[ffi::DEVSTAT_READ].frac,
            ) as f64,
        );
        io.write
            .bytes
            .update(now, stat.bytes[ffi::DEVSTAT_WRITE] as f64);
        io.write
            .operations
            .update(now, stat.operations[ffi::DEVSTAT_WRITE] as f64);
        io.write.time.update(
            now,
            bintime_to_millis(
                stat.duration[ffi::DEVSTAT_WRITE].sec,
                stat.duration[ffi::DEVSTAT_WRITE].frac,
            ) as f64,
        );
    }
    Ok(())
}

/// The kernel offers no per-mount NFS client counters usable here.
pub(in super::super) fn nfs(
    _key: &str,
    _root: &Path,
    _cache: &mut ActivityCache,
    _now: u64,
    _io: &mut IoStatistics,
) -> Result<()> {
    Ok(())
}

pub(in super::super) fn cifs(
    _share: &str,
    _root: &Path,
    _now: u64,
    _io: &mut IoStatistics,
) -> Result<()> {
    Ok(())
}

/// ZFS pool statistics need libzfs, which is not part of the base system's
/// development set; collection stays a soft no-op.
pub(in super::super) fn zfs(
    _pool: &str,
    _root: &Path,
    _now: u64,
    _io: &mut IoStatistics,
) -> Result<()> {
    Ok(())
}
