//! BSD-family mount-table source: the sized syscall pair
//! (`getfsstat` on FreeBSD/OpenBSD/Darwin, `getvfsstat` on NetBSD), run
//! through the count-then-fetch helper so concurrent mount activity between
//! the sizing call and the fetch is tolerated.

use std::ffi::CStr;
use std::io;
use std::path::Path;

use super::super::change::{ChangeDetector, Mode};
use super::super::error::{Error, Result};
use super::super::{MountEntry, fetch::fetch_sized};

fn cstr_field(bytes: &[libc::c_char]) -> String {
    unsafe { CStr::from_ptr(bytes.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

#[cfg(not(target_os = "netbsd"))]
fn raw_mount_table() -> io::Result<Vec<libc::statfs>> {
    fetch_sized(
        unsafe { std::mem::zeroed::<libc::statfs>() },
        || {
            let n = unsafe { libc::getfsstat(std::ptr::null_mut(), 0, libc::MNT_NOWAIT) };
            if n < 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok(n as usize)
            }
        },
        |buf| {
            let bytes = std::mem::size_of_val(buf);
            let n = unsafe { libc::getfsstat(buf.as_mut_ptr(), bytes as _, libc::MNT_NOWAIT) };
            if n < 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok(n as usize)
            }
        },
    )
}

#[cfg(target_os = "netbsd")]
fn raw_mount_table() -> io::Result<Vec<libc::statvfs>> {
    fetch_sized(
        unsafe { std::mem::zeroed::<libc::statvfs>() },
        || {
            let n = unsafe { libc::getvfsstat(std::ptr::null_mut(), 0, libc::MNT_NOWAIT) };
            if n < 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok(n as usize)
            }
        },
        |buf| {
            let bytes = std::mem::size_of_val(buf);
            let n = unsafe { libc::getvfsstat(buf.as_mut_ptr(), bytes, libc::MNT_NOWAIT) };
            if n < 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok(n as usize)
            }
        },
    )
}

/// Reads the current mount table via the platform's sized syscall pair.
/// `root` is unused here: the table is not file-backed.
///
/// # Errors
///
/// Returns [`Error::Syscall`] when either phase of the query fails.
pub fn read_mount_table(_root: &Path) -> Result<Vec<MountEntry>> {
    let raw = raw_mount_table().map_err(|source| Error::Syscall { source })?;
    Ok(raw
        .iter()
        .map(|fs| MountEntry {
            device: cstr_field(&fs.f_mntfromname),
            mountpoint: cstr_field(&fs.f_mntonname),
            fstype: cstr_field(&fs.f_fstypename),
            options: String::new(),
        })
        .collect())
}

/// No cheap change signal exists for the syscall-backed table; rescan every
/// cycle regardless of mode.
pub fn change_detector(_root: &Path, _mode: Mode) -> ChangeDetector {
    ChangeDetector::always()
}
