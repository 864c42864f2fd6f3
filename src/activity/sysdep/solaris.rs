//! Solaris activity collection through libkstat.
//!
//! Kernel I/O statistics are `KSTAT_TYPE_IO` entries keyed by driver
//! module, instance number and name (`sd`/0/`sd0,a`; `nfs`/2/`nfs2`). The
//! resolver encodes all three into the handle key; this collector splits
//! the key back apart, looks the entry up and reads one `kstat_io_t`.

use std::ffi::CString;
use std::io;
use std::path::Path;

use crate::statistics::IoStatistics;

use super::super::error::{Error, Result};
use super::super::units::nanos_to_millis;

mod ffi {
    use libc::{c_char, c_int, c_uchar, c_uint, c_void};

    pub const KSTAT_TYPE_IO: c_uchar = 3;
    pub const KSTAT_STRLEN: usize = 31;

    #[repr(C)]
    pub struct kstat_ctl_t {
        pub kc_chain_id: c_int,
        pub kc_chain: *mut kstat_t,
        pub kc_kd: c_int,
    }

    #[repr(C)]
    pub struct kstat_t {
        pub ks_crtime: i64,
        pub ks_next: *mut kstat_t,
        pub ks_kid: c_int,
        pub ks_module: [c_char; KSTAT_STRLEN],
        pub ks_resv: c_uchar,
        pub ks_instance: c_int,
        pub ks_name: [c_char; KSTAT_STRLEN],
        pub ks_type: c_uchar,
        pub ks_class: [c_char; KSTAT_STRLEN],
        pub ks_flags: c_uchar,
        pub ks_data: *mut c_void,
        pub ks_ndata: c_uint,
        pub ks_data_size: usize,
        pub ks_snaptime: i64,
        // Private members follow in the C header; they are never accessed
        // through this view.
    }

    #[repr(C)]
    #[derive(Clone, Copy, Default)]
    pub struct kstat_io_t {
        pub nread: u64,
        pub nwritten: u64,
        pub reads: c_uint,
        pub writes: c_uint,
        pub wtime: i64,
        pub wlentime: i64,
        pub wlastupdate: i64,
        pub rtime: i64,
        pub rlentime: i64,
        pub rlastupdate: i64,
        pub wcnt: c_uint,
        pub rcnt: c_uint,
    }

    #[link(name = "kstat")]
    unsafe extern "C" {
        pub fn kstat_open() -> *mut kstat_ctl_t;
        pub fn kstat_close(kc: *mut kstat_ctl_t) -> c_int;
        pub fn kstat_lookup(
            kc: *mut kstat_ctl_t,
            module: *const c_char,
            instance: c_int,
            name: *const c_char,
        ) -> *mut kstat_t;
        pub fn kstat_read(kc: *mut kstat_ctl_t, ksp: *mut kstat_t, data: *mut c_void) -> c_int;
    }
}

/// The kstat chain is opened and closed per refresh; nothing to cache.
#[derive(Debug, Default)]
pub struct ActivityCache;

/// Open kstat chain, closed on every exit path.
struct KstatChain(*mut ffi::kstat_ctl_t);

impl KstatChain {
    fn open() -> io::Result<Self> {
        let kc = unsafe { ffi::kstat_open() };
        if kc.is_null() {
            Err(io::Error::last_os_error())
        } else {
            Ok(Self(kc))
        }
    }

    fn read_io(&self, module: &str, instance: i32, name: &str) -> io::Result<Option<ffi::kstat_io_t>> {
        let module = CString::new(module).map_err(io::Error::other)?;
        let name = CString::new(name).map_err(io::Error::other)?;
        let ksp = unsafe {
            ffi::kstat_lookup(self.0, module.as_ptr(), instance, name.as_ptr())
        };
        if ksp.is_null() || unsafe { (*ksp).ks_type } != ffi::KSTAT_TYPE_IO {
            return Ok(None);
        }
        let mut kio = ffi::kstat_io_t::default();
        let rc = unsafe {
            ffi::kstat_read(self.0, ksp, (&mut kio as *mut ffi::kstat_io_t).cast())
        };
        if rc == -1 {
            Err(io::Error::last_os_error())
        } else {
            Ok(Some(kio))
        }
    }
}

impl Drop for KstatChain {
    fn drop(&mut self) {
        unsafe { ffi::kstat_close(self.0) };
    }
}

/// Splits a statistics key back into (module, instance): `sd0,a` ->
/// `("sd", 0)`, `nfs2` -> `("nfs", 2)`.
fn split_key(key: &str) -> Option<(&str, i32)> {
    let digit = key.find(|c: char| c.is_ascii_digit())?;
    if digit == 0 {
        return None;
    }
    let instance = key[digit..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .ok()?;
    Some((&key[..digit], instance))
}

fn collect_io(key: &str, now: u64, io: &mut IoStatistics) -> Result<()> {
    let Some((module, instance)) = split_key(key) else {
        log::debug!("unrecognized kstat key `{key}`");
        return Ok(());
    };

    let chain = KstatChain::open().map_err(|source| Error::Syscall { source })?;
    let kio = chain
        .read_io(module, instance, key)
        .map_err(|source| Error::Syscall { source })?;

    if let Some(kio) = kio {
        io.read.bytes.update(now, kio.nread as f64);
        io.write.bytes.update(now, kio.nwritten as f64);
        io.read.operations.update(now, kio.reads as f64);
        io.write.operations.update(now, kio.writes as f64);
        io.wait_time.update(now, nanos_to_millis(kio.wtime));
        io.run_time.update(now, nanos_to_millis(kio.rtime));
    }
    Ok(())
}

pub(in super::super) fn block(
    key: &str,
    _mountpoint: &str,
    _root: &Path,
    _cache: &mut ActivityCache,
    now: u64,
    io: &mut IoStatistics,
) -> Result<()> {
    collect_io(key, now, io)
}

/// NFS client mounts have their own `KSTAT_TYPE_IO` entries keyed
/// `nfs<minor>`.
pub(in super::super) fn nfs(
    key: &str,
    _root: &Path,
    _cache: &mut ActivityCache,
    now: u64,
    io: &mut IoStatistics,
) -> Result<()> {
    collect_io(key, now, io)
}

pub(in super::super) fn cifs(
    _share: &str,
    _root: &Path,
    _now: u64,
    _io: &mut IoStatistics,
) -> Result<()> {
    Ok(())
}

/// Pool statistics need libzfs; collection stays a soft no-op.
pub(in super::super) fn zfs(
    _pool: &str,
    _root: &Path,
    _now: u64,
    _io: &mut IoStatistics,
) -> Result<()> {
    Ok(())
}
