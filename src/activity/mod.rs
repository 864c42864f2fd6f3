//! Per-classification I/O activity collection.
//!
//! Every resolved filesystem carries one of five collection strategies
//! (local block device, NFS client, CIFS share, ZFS pool, or virtual) and
//! [`collect`] dispatches to the platform implementation for it. Each
//! strategy reads its kernel statistics source and feeds every
//! successfully parsed field into the accumulators with the current
//! timestamp; a field whose source line is absent is simply not updated
//! that cycle. Virtual filesystems are a successful no-op.
//!
//! The [`ActivityCache`] holds whatever process-wide snapshot the platform
//! caches between calls (the BSDs report all devices in one query); it is
//! owned by the polling loop and passed by reference into each cycle.

pub mod blockstat;
mod cache;
pub mod cifs;
mod error;
pub mod nfs;
mod sysdep;
mod units;
pub mod zfs;

pub use cache::Freshness;
pub use error::{Error, ParseError, Result};
pub use sysdep::ActivityCache;
pub use units::{bintime_to_millis, micros_to_millis, nanos_to_millis, timeval_to_millis};

use std::path::Path;

use crate::device::{Classification, DeviceHandle};
use crate::statistics::IoStatistics;

/// Collects one cycle of activity for a resolved filesystem.
///
/// `now` is the cycle timestamp in milliseconds; `root` is the process
/// root prefix for the pseudo-file sources.
///
/// # Errors
///
/// Returns an error when the strategy's statistics source is unreadable or
/// malformed: environmental conditions the caller logs and retries next
/// cycle. A source that is readable but carries no section for this
/// device is not an error.
pub fn collect(
    handle: &DeviceHandle,
    root: &Path,
    cache: &mut ActivityCache,
    now: u64,
    io: &mut IoStatistics,
) -> Result<()> {
    match &handle.classification {
        Classification::LocalBlock { key } => {
            sysdep::block(key, &handle.mountpoint, root, cache, now, io)
        }
        Classification::Nfs { key } => sysdep::nfs(key, root, cache, now, io),
        Classification::Cifs { share } => sysdep::cifs(share, root, now, io),
        Classification::ZfsPool { pool } => sysdep::zfs(pool, root, now, io),
        Classification::Virtual => Ok(()),
    }
}
