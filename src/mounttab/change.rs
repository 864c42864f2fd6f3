//! Cheap mount-table change detection.
//!
//! Re-resolving every monitored filesystem against a freshly parsed mount
//! table on every poll cycle is wasteful; a [`ChangeDetector`] answers the
//! much cheaper question "has the table changed since generation N?". Three
//! strategies exist, in increasing sophistication:
//!
//! - [`ChangeDetector::always`] — report a change on every poll. Used where
//!   the platform offers no cheap signal; correctness over efficiency.
//! - [`ChangeDetector::timestamp`] — compare the mount source's
//!   modification time (seconds plus nanoseconds where the filesystem
//!   provides them) against the last observed value. Any difference, forward
//!   or backward, counts as a change. On sources with whole-second
//!   granularity, multiple mutations within the same second after a poll
//!   are indistinguishable; this blind spot is an accepted limitation.
//! - [`ChangeDetector::notify`] — keep a long-lived non-blocking descriptor
//!   open on the mount source and perform a zero-timeout `poll(2)` for the
//!   priority/error condition the kernel raises when the table changes.
//!   The descriptor is opened lazily on the first check (so one-shot
//!   invocations never pay for it) and re-opened after each edge to re-arm
//!   the condition.
//!
//! Every strategy feeds the same generation counter: a monotonically
//! increasing integer shared read-only by all cached device handles.

use std::os::fd::{FromRawFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::MetadataExt;
use std::path::PathBuf;

/// How the surrounding process runs: a single probe pass or an attended
/// polling daemon. Only a daemon keeps long-lived change-notification
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Once,
    Daemon,
}

#[derive(Debug)]
enum Strategy {
    Always,
    Timestamp {
        path: PathBuf,
        seen: Option<(i64, i64)>,
    },
    Notify {
        path: PathBuf,
        fd: Option<OwnedFd>,
    },
}

/// Mount-table change detector and owner of the generation counter.
#[derive(Debug)]
pub struct ChangeDetector {
    strategy: Strategy,
    generation: u64,
}

impl ChangeDetector {
    /// A detector that reports a change on every poll.
    pub fn always() -> Self {
        Self {
            strategy: Strategy::Always,
            generation: 0,
        }
    }

    /// A detector comparing the modification time of `path`.
    pub fn timestamp(path: impl Into<PathBuf>) -> Self {
        Self {
            strategy: Strategy::Timestamp {
                path: path.into(),
                seen: None,
            },
            generation: 0,
        }
    }

    /// A detector holding a notification descriptor open on `path`.
    pub fn notify(path: impl Into<PathBuf>) -> Self {
        Self {
            strategy: Strategy::Notify {
                path: path.into(),
                fd: None,
            },
            generation: 0,
        }
    }

    /// Polls the change signal and returns the current generation, bumping
    /// it when a change was observed since the previous call.
    pub fn poll_generation(&mut self) -> u64 {
        if self.strategy.changed() {
            self.generation += 1;
        }
        self.generation
    }

    /// The generation as of the last poll, without re-checking the signal.
    pub fn current(&self) -> u64 {
        self.generation
    }
}

impl Strategy {
    fn changed(&mut self) -> bool {
        match self {
            Strategy::Always => true,
            Strategy::Timestamp { path, seen } => {
                let observed = match std::fs::metadata(&*path) {
                    Ok(metadata) => (metadata.mtime(), metadata.mtime_nsec()),
                    Err(err) => {
                        // Unable to stat the source: force a rescan and let
                        // the table read surface the real error.
                        log::debug!(
                            "cannot stat mount table `{}`: {err}",
                            path.display()
                        );
                        *seen = None;
                        return true;
                    }
                };
                match seen.replace(observed) {
                    Some(previous) => previous != observed,
                    None => true,
                }
            }
            Strategy::Notify { path, fd } => {
                let Some(descriptor) = open_notify_fd(path.as_path(), fd) else {
                    // No descriptor: force a rescan every cycle.
                    return true;
                };

                let mut pfd = libc::pollfd {
                    fd: descriptor,
                    events: libc::POLLPRI,
                    revents: 0,
                };
                let rc = unsafe { libc::poll(&mut pfd, 1, 0) };
                if rc < 0 {
                    log::debug!(
                        "poll on mount table `{}` failed: {}",
                        path.display(),
                        std::io::Error::last_os_error()
                    );
                    return true;
                }
                if rc > 0 && pfd.revents & (libc::POLLPRI | libc::POLLERR) != 0 {
                    // The condition stays raised until the table is re-read
                    // through the descriptor; re-opening re-arms it.
                    *fd = None;
                    return true;
                }
                false
            }
        }
    }
}

/// Opens (or returns the already-open) notification descriptor and reports
/// the raw fd for polling. A fresh open starts armed with no pending edge;
/// the initial full scan is forced by the absence of any cached handle, not
/// by the detector.
fn open_notify_fd(path: &std::path::Path, fd: &mut Option<OwnedFd>) -> Option<libc::c_int> {
    use std::os::fd::AsRawFd;

    if fd.is_none() {
        let cpath = std::ffi::CString::new(path.as_os_str().as_bytes()).ok()?;
        let raw = unsafe { libc::open(cpath.as_ptr(), libc::O_RDONLY | libc::O_NONBLOCK) };
        if raw < 0 {
            log::debug!(
                "cannot open mount table notification descriptor `{}`: {}",
                path.display(),
                std::io::Error::last_os_error()
            );
            return None;
        }
        *fd = Some(unsafe { OwnedFd::from_raw_fd(raw) });
    }
    fd.as_ref().map(|owned| owned.as_raw_fd())
}
