//! NetBSD activity collection: the `CTL_HW`/`HW_IOSTATS` sysctl array of
//! `struct io_sysctl`, cached and refreshed at most once per second.
//!
//! Only `ffs` filesystems resolve to a block key on this platform; the
//! kernel keeps NFS statistics too, but offers no mapping between its
//! `nfsX` labels and mounts, so NFS stays a no-op.

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

    pub const HW_IOSTATS: libc::c_int = 9;
    pub const IOSTATNAMELEN: usize = 36;

    #[repr(C)]
    #[derive(Clone, Copy)]
    pub struct io_sysctl {
        pub busy: i32,
        pub pad: i32,
        pub xfer: u64,
        pub seek: u64,
        pub bytes: u64,
        pub wait_sec: u64,
        pub wait_usec: u64,
        pub time_sec: u64,
        pub time_usec: u64,
        pub wait_msec: u64,
        pub time_msec: u64,
        pub rxfer: u64,
        pub wxfer: u64,
        pub rbytes: u64,
        pub wbytes: u64,
        pub attachtime_sec: u64,
        pub attachtime_usec: u64,
        pub timestamp_sec: u64,
        pub timestamp_usec: u64,
        pub name: [c_char; IOSTATNAMELEN],
    }
}

/// Cached whole-system I/O statistics snapshot.
#[derive(Default)]
pub struct ActivityCache {
    freshness: Freshness,
    disks: Vec<ffi::io_sysctl>,
}

impl std::fmt::Debug for ActivityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityCache")
            .field("disks", &self.disks.len())
            .finish()
    }
}

fn iostat_snapshot() -> io::Result<Vec<ffi::io_sysctl>> {
    let stride = std::mem::size_of::<ffi::io_sysctl>();

    fetch_sized(
        unsafe { std::mem::zeroed::<ffi::io_sysctl>() },
        || {
            let mut mib = [libc::CTL_HW, ffi::HW_IOSTATS, stride as libc::c_int];
            let mut len: libc::size_t = 0;
            let rc = unsafe {
                libc::sysctl(
                    mib.as_mut_ptr(),
                    3,
                    std::ptr::null_mut(),
                    &mut len,
                    std::ptr::null_mut(),
                    0,
                )
            };
            if rc < 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok(len / stride)
            }
        },
        |buf| {
            let mut mib = [libc::CTL_HW, ffi::HW_IOSTATS, stride as libc::c_int];
            let mut len: libc::size_t = std::mem::size_of_val(buf);
            let rc = unsafe {
                libc::sysctl(
                    mib.as_mut_ptr(),
                    3,
                    buf.as_mut_ptr().cast(),
                    &mut len,
                    std::ptr::null_mut(),
                    0,
                )
            };
            if rc < 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok(len / stride)
            }
        },
    )
}

impl ActivityCache {
    fn refresh(&mut self, now: u64) -> Result<()> {
        if self.freshness.is_stale(now) {
            self.disks = iostat_snapshot().map_err(|source| Error::Syscall { source })?;
            self.freshness.mark_refreshed(now);
        }
        Ok(())
    }
}

fn disk_name(disk: &ffi::io_sysctl) -> &str {
    unsafe { CStr::from_ptr(disk.name.as_ptr()) }
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
        io.read.bytes.update(now, disk.rbytes as f64);
        io.write.bytes.update(now, disk.wbytes as f64);
        io.read.operations.update(now, disk.rxfer as f64);
        io.write.operations.update(now, disk.wxfer as f64);
        io.run_time.update(
            now,
            timeval_to_millis(disk.time_sec as i64, disk.time_usec as i64),
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
