//! OpenBSD activity collection: the `CTL_HW`/`HW_DISKSTATS` sysctl array
//! of `struct diskstats`, sized via `HW_DISKCOUNT`, cached and refreshed
//! at most once per second.

use std::ffi::CStr;
use std::io;
use std::path::Path;

use crate::mounttab::fetch_sized;
use crate::statistics::IoStatistics;

use super::super::cache::Freshness;
use super::super::error::{Error, Result};
use super::super::units::timeval_to_millis;

mod ffi {
    use libc::c_char;

    pub const HW_DISKSTATS: libc::c_int = 9;
    pub const HW_DISKCOUNT: libc::c_int = 10;

    #[repr(C)]
    #[derive(Clone, Copy)]
    pub struct diskstats {
        pub ds_name: [c_char; 16],
        pub ds_busy: libc::c_int,
        pub ds_rxfer: u64,
        pub ds_wxfer: u64,
        pub ds_seek: u64,
        pub ds_rbytes: u64,
        pub ds_wbytes: u64,
        pub ds_attachtime: libc::timeval,
        pub ds_timestamp: libc::timeval,
        pub ds_time: libc::timeval,
    }
}

/// Cached whole-system disk statistics snapshot.
#[derive(Default)]
pub struct ActivityCache {
    freshness: Freshness,
    disks: Vec<ffi::diskstats>,
}

impl std::fmt::Debug for ActivityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityCache")
            .field("disks", &self.disks.len())
            .finish()
    }
}

fn diskstats_snapshot() -> io::Result<Vec<ffi::diskstats>> {
    fetch_sized(
        unsafe { std::mem::zeroed::<ffi::diskstats>() },
        || {
            let mut mib = [libc::CTL_HW, ffi::HW_DISKCOUNT];
            let mut count: libc::c_int = 0;
            let mut len = std::mem::size_of::<libc::c_int>();
            let rc = unsafe {
                libc::sysctl(
                    mib.as_mut_ptr(),
                    2,
                    (&mut count as *mut libc::c_int).cast(),
                    &mut len,
                    std::ptr::null_mut(),
                    0,
                )
            };
            if rc < 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok(count as usize)
            }
        },
        |buf| {
            let mut mib = [libc::CTL_HW, ffi::HW_DISKSTATS];
            let mut len: libc::size_t = std::mem::size_of_val(buf);
            let rc = unsafe {
                libc::sysctl(
                    mib.as_mut_ptr(),
                    2,
                    buf.as_mut_ptr().cast(),
                    &mut len,
                    std::ptr::null_mut(),
                    0,
                )
            };
            if rc < 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok(len / std::mem::size_of::<ffi::diskstats>())
            }
        },
    )
}

impl ActivityCache {
    fn refresh(&mut self, now: u64) -> Result<()> {
        if self.freshness.is_stale(now) {
            self.disks = diskstats_snapshot().map_err(|source| Error::Syscall { source })?;
            self.freshness.mark_refreshed(now);
        }
        Ok(())
    }
}

fn disk_name(disk: &ffi::diskstats) -> &str {
    unsafe { CStr::from_ptr(disk.ds_name.as_ptr()) }
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
    cache.refresh(now)?;

    if let Some(disk) = cache.disks.iter().find(|disk| disk_name(disk) == key) {
        io.read.bytes.update(now, disk.ds_rbytes as f64);
        io.write.bytes.update(now, disk.ds_wbytes as f64);
        io.read.operations.update(now, disk.ds_rxfer as f64);
        io.write.operations.update(now, disk.ds_wxfer as f64);
        io.run_time.update(
            now,
            timeval_to_millis(disk.ds_time.tv_sec as i64, disk.ds_time.tv_usec as i64),
        );
    }
    Ok(())
}

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

pub(in super::super) fn zfs(
    _pool: &str,
    _root: &Path,
    _now: u64,
    _io: &mut IoStatistics,
) -> Result<()> {
    Ok(())
}
