//! Capacity and inode usage collection.
//!
//! One strategy serves every platform: a `statvfs` call on the mountpoint.
//! Kernels that report space in fragments rather than blocks are
//! normalized through the `f_bsize / f_frsize` size factor, so the emitted
//! block counts are always in units of the emitted block size. The
//! previous mount-flag bits are preserved before being overwritten, which
//! lets the caller detect flag transitions (a read-only remount, for
//! example) between cycles.

mod error;

pub use error::{Error, Result};

use serde::Serialize;

/// Capacity, inode and mount-flag state for one filesystem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Usage {
    /// Reported block size in bytes.
    pub block_size: u64,
    /// Total block count, in `block_size` units.
    pub blocks: u64,
    /// Free blocks, including the root-reserved area.
    pub blocks_free: u64,
    /// Blocks available to unprivileged users.
    pub blocks_available: u64,
    /// Total inode count; zero where the filesystem has no inode notion.
    pub files: u64,
    /// Free inodes.
    pub files_free: u64,
    /// Opaque mount-flag bits from the last collection.
    pub flags: u64,
    /// The flag bits of the collection before that.
    pub previous_flags: u64,
}

/// The fragment-to-block scaling factor: how many fragment-sized units
/// make up one reported block. `1` when the kernel already reports in
/// block units (or reports no fragment size at all).
pub fn size_factor(block_size: u64, fragment_size: u64) -> u64 {
    if fragment_size > 0 && block_size > fragment_size {
        block_size / fragment_size
    } else {
        1
    }
}

/// Collects usage for the filesystem mounted at `mountpoint`, writing into
/// `usage` in place.
///
/// # Errors
///
/// Returns [`Error::Statvfs`] when the call fails (typically because the
/// target is no longer mounted); the caller treats the cycle as failed and
/// skips activity collection.
pub fn collect(mountpoint: &str, usage: &mut Usage) -> Result<()> {
    let stat = nix::sys::statvfs::statvfs(mountpoint).map_err(|source| Error::Statvfs {
        mountpoint: mountpoint.to_owned(),
        source,
    })?;

    let factor = size_factor(stat.block_size() as u64, stat.fragment_size() as u64);
    usage.block_size = stat.block_size() as u64;
    usage.blocks = stat.blocks() as u64 / factor;
    usage.blocks_free = stat.blocks_free() as u64 / factor;
    usage.blocks_available = stat.blocks_available() as u64 / factor;
    usage.files = stat.files() as u64;
    usage.files_free = stat.files_free() as u64;
    usage.previous_flags = usage.flags;
    usage.flags = stat.flags().bits() as u64;
    Ok(())
}
