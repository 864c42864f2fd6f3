//! Linux activity collection: per-device and per-subsystem pseudo-files
//! under `/sys` and `/proc`, reopened each cycle.

use std::io;
use std::path::Path;

use crate::fsutil;
use crate::statistics::IoStatistics;

use super::super::blockstat::BlockDeviceStat;
use super::super::error::{Error, Result};
use super::super::{cifs, nfs, zfs};

/// NFS client statistics source, relative to the process root.
const NFS_STATS: &str = "proc/self/mountstats";
/// CIFS client statistics source, relative to the process root.
const CIFS_STATS: &str = "proc/fs/cifs/Stats";

/// Linux keeps per-device statistics in individual pseudo-files, so no
/// process-wide snapshot needs caching.
#[derive(Debug, Default)]
pub struct ActivityCache;

pub(in super::super) fn block(
    key: &str,
    _mountpoint: &str,
    root: &Path,
    _cache: &mut ActivityCache,
    now: u64,
    io: &mut IoStatistics,
) -> Result<()> {
    let path = root.join("sys/class/block").join(key).join("stat");
    let mut reader = fsutil::open_file_reader(&path)?;
    let stat = BlockDeviceStat::from_reader(&mut reader)
        .map_err(|source| Error::Parse { path, source })?;
    stat.apply(now, io);
    Ok(())
}

pub(in super::super) fn nfs(
    key: &str,
    root: &Path,
    _cache: &mut ActivityCache,
    now: u64,
    io: &mut IoStatistics,
) -> Result<()> {
    let path = root.join(NFS_STATS);
    let mut reader = fsutil::open_file_reader(&path)?;
    match nfs::scan(&mut reader, key).map_err(|source| Error::Parse { path, source })? {
        Some(activity) => activity.apply(now, io),
        None => log::debug!("no NFS statistics section for device `{key}`"),
    }
    Ok(())
}

pub(in super::super) fn cifs(
    share: &str,
    root: &Path,
    now: u64,
    io: &mut IoStatistics,
) -> Result<()> {
    let path = root.join(CIFS_STATS);
    let mut reader = fsutil::open_file_reader(&path)?;
    match cifs::scan(&mut reader, share).map_err(|source| Error::Parse { path, source })? {
        Some(activity) => activity.apply(now, io),
        None => log::debug!("no CIFS statistics entry for share `{share}`"),
    }
    Ok(())
}

pub(in super::super) fn zfs(
    pool: &str,
    root: &Path,
    now: u64,
    io: &mut IoStatistics,
) -> Result<()> {
    let path = root.join("proc/spl/kstat/zfs").join(pool).join("io");
    let mut reader = match fsutil::open_file_reader(&path) {
        Ok(reader) => reader,
        Err(err) if err.source.kind() == io::ErrorKind::NotFound => {
            // Pool exists but its I/O kstat does not: soft, no update.
            log::debug!("no I/O kstat for pool `{pool}`");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };
    match zfs::from_reader(&mut reader).map_err(|source| Error::Parse { path, source })? {
        Some(pool_io) => pool_io.apply(now, io),
        None => log::debug!("I/O kstat for pool `{pool}` is incomplete"),
    }
    Ok(())
}
