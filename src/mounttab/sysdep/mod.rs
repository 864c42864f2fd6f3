//! Per-kernel mount-table sources.
//!
//! Each platform module exposes the same two functions:
//!
//! - `read_mount_table(root)` — produce the ordered list of currently
//!   mounted filesystems;
//! - `change_detector(root, mode)` — the cheapest change-detection strategy
//!   the platform supports for that invocation mode.
//!
//! `root` is the process root prefix (normally `/`); tests point it at a
//! fake tree.

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::{MOUNT_SOURCE, change_detector, read_mount_table};

#[cfg(any(
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd",
    target_os = "macos"
))]
mod bsd;
#[cfg(any(
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd",
    target_os = "macos"
))]
pub use bsd::{change_detector, read_mount_table};

#[cfg(any(target_os = "solaris", target_os = "illumos"))]
mod solaris;
#[cfg(any(target_os = "solaris", target_os = "illumos"))]
pub use solaris::{MOUNT_SOURCE, change_detector, read_mount_table};
