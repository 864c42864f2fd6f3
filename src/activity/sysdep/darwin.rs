//! Darwin activity collection through DiskArbitration and the I/O
//! registry.
//!
//! The volume's whole disk is located from its mount path, and the block
//! storage driver's `Statistics` dictionary is read from the registry.
//! Every Core Foundation object acquired here is released on every exit
//! path; the helper types below carry the releases in their `Drop` impls.
//!
//! Time counters in the statistics dictionary are nanoseconds.

use std::path::Path;

use crate::statistics::IoStatistics;

use super::super::error::Result;
use super::super::units::nanos_to_millis;

mod ffi {
    use std::ffi::c_void;

    pub type CFTypeRef = *const c_void;
    pub type CFStringRef = *const c_void;
    pub type CFDictionaryRef = *const c_void;
    pub type CFNumberRef = *const c_void;
    pub type CFURLRef = *const c_void;
    pub type CFAllocatorRef = *const c_void;
    pub type DASessionRef = *const c_void;
    pub type DADiskRef = *const c_void;
    pub type IoObject = u32;

    pub const K_CF_STRING_ENCODING_UTF8: u32 = 0x0800_0100;
    pub const K_CF_NUMBER_SINT64_TYPE: i32 = 4;
    pub const K_IO_REGISTRY_ITERATE_RECURSIVELY: u32 = 1;
    pub const K_IO_REGISTRY_ITERATE_PARENTS: u32 = 2;

    #[link(name = "CoreFoundation", kind = "framework")]
    unsafe extern "C" {
        pub fn CFRelease(cf: CFTypeRef);
        pub fn CFStringCreateWithCString(
            alloc: CFAllocatorRef,
            c_str: *const libc::c_char,
            encoding: u32,
        ) -> CFStringRef;
        pub fn CFURLCreateFromFileSystemRepresentation(
            alloc: CFAllocatorRef,
            buffer: *const u8,
            buf_len: libc::c_long,
            is_directory: bool,
        ) -> CFURLRef;
        pub fn CFDictionaryGetValue(dict: CFDictionaryRef, key: CFTypeRef) -> CFTypeRef;
        pub fn CFNumberGetValue(number: CFNumberRef, the_type: i32, value: *mut c_void) -> bool;
    }

    #[link(name = "DiskArbitration", kind = "framework")]
    unsafe extern "C" {
        pub fn DASessionCreate(alloc: CFAllocatorRef) -> DASessionRef;
        pub fn DADiskCreateFromVolumePath(
            alloc: CFAllocatorRef,
            session: DASessionRef,
            path: CFURLRef,
        ) -> DADiskRef;
        pub fn DADiskCopyWholeDisk(disk: DADiskRef) -> DADiskRef;
        pub fn DADiskCopyIOMedia(disk: DADiskRef) -> IoObject;
    }

    #[link(name = "IOKit", kind = "framework")]
    unsafe extern "C" {
        pub fn IORegistryEntrySearchCFProperty(
            entry: IoObject,
            plane: *const libc::c_char,
            key: CFStringRef,
            allocator: CFAllocatorRef,
            options: u32,
        ) -> CFTypeRef;
        pub fn IOObjectRelease(object: IoObject) -> libc::c_int;
    }
}

/// Released-on-drop Core Foundation reference.
struct CfRef(ffi::CFTypeRef);

impl CfRef {
    fn new(raw: ffi::CFTypeRef) -> Option<Self> {
        (!raw.is_null()).then_some(Self(raw))
    }
}

impl Drop for CfRef {
    fn drop(&mut self) {
        unsafe { ffi::CFRelease(self.0) };
    }
}

/// Released-on-drop I/O registry object.
struct IoMedia(ffi::IoObject);

impl IoMedia {
    fn new(raw: ffi::IoObject) -> Option<Self> {
        (raw != 0).then_some(Self(raw))
    }
}

impl Drop for IoMedia {
    fn drop(&mut self) {
        unsafe { ffi::IOObjectRelease(self.0) };
    }
}

fn cf_string(text: &str) -> Option<CfRef> {
    let c_text = std::ffi::CString::new(text).ok()?;
    CfRef::new(unsafe {
        ffi::CFStringCreateWithCString(
            std::ptr::null(),
            c_text.as_ptr(),
            ffi::K_CF_STRING_ENCODING_UTF8,
        )
    })
}

fn dictionary_u64(dict: ffi::CFDictionaryRef, key: &str) -> Option<u64> {
    let key = cf_string(key)?;
    let number = unsafe { ffi::CFDictionaryGetValue(dict, key.0) };
    if number.is_null() {
        return None;
    }
    let mut value: i64 = 0;
    let ok = unsafe {
        ffi::CFNumberGetValue(
            number,
            ffi::K_CF_NUMBER_SINT64_TYPE,
            (&mut value as *mut i64).cast(),
        )
    };
    ok.then_some(value as u64)
}

/// Reads the block storage driver statistics dictionary for the volume at
/// `mountpoint`, returning `None` when any step of the registry walk
/// fails (the volume vanished, or it has no backing whole disk).
fn driver_statistics(mountpoint: &str) -> Option<(CfRef, ffi::CFDictionaryRef)> {
    let session = CfRef::new(unsafe { ffi::DASessionCreate(std::ptr::null()) })?;
    let url = CfRef::new(unsafe {
        ffi::CFURLCreateFromFileSystemRepresentation(
            std::ptr::null(),
            mountpoint.as_ptr(),
            mountpoint.len() as libc::c_long,
            true,
        )
    })?;
    let disk = CfRef::new(unsafe {
        ffi::DADiskCreateFromVolumePath(std::ptr::null(), session.0, url.0)
    })?;
    let whole_disk = CfRef::new(unsafe { ffi::DADiskCopyWholeDisk(disk.0) })?;
    let media = IoMedia::new(unsafe { ffi::DADiskCopyIOMedia(whole_disk.0) })?;

    let key = cf_string("Statistics")?;
    let statistics = CfRef::new(unsafe {
        ffi::IORegistryEntrySearchCFProperty(
            media.0,
            c"IOService".as_ptr(),
            key.0,
            std::ptr::null(),
            ffi::K_IO_REGISTRY_ITERATE_RECURSIVELY | ffi::K_IO_REGISTRY_ITERATE_PARENTS,
        )
    })?;
    let dict = statistics.0;
    Some((statistics, dict))
}

pub(in super::super) fn block(
    _key: &str,
    mountpoint: &str,
    _root: &Path,
    _cache: &mut ActivityCache,
    now: u64,
    io: &mut IoStatistics,
) -> Result<()> {
    let Some((_guard, dict)) = driver_statistics(mountpoint) else {
        log::debug!("no driver statistics for volume `{mountpoint}`");
        return Ok(());
    };

    if let Some(bytes) = dictionary_u64(dict, "Bytes (Read)") {
        io.read.bytes.update(now, bytes as f64);
    }
    if let Some(operations) = dictionary_u64(dict, "Operations (Read)") {
        io.read.operations.update(now, operations as f64);
    }
    if let Some(time) = dictionary_u64(dict, "Total Time (Read)") {
        io.read.time.update(now, nanos_to_millis(time as i64));
    }
    if let Some(bytes) = dictionary_u64(dict, "Bytes (Write)") {
        io.write.bytes.update(now, bytes as f64);
    }
    if let Some(operations) = dictionary_u64(dict, "Operations (Write)") {
        io.write.operations.update(now, operations as f64);
    }
    if let Some(time) = dictionary_u64(dict, "Total Time (Write)") {
        io.write.time.update(now, nanos_to_millis(time as i64));
    }
    Ok(())
}

/// No per-disk caching on this platform.
#[derive(Debug, Default)]
pub struct ActivityCache;

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
