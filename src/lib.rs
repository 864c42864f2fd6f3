use std::time::Duration;

use error::ResultOkLogExt;
use filesystem::{FilesystemInfo, Platform};
use mounttab::Mode;

/// fsmon: the platform-abstraction layer of a filesystem monitoring
/// daemon.
///
/// For each monitored filesystem, the library resolves the mountpoint or
/// device path to the kernel device behind it via the platform's
/// mount-table mechanism, detects mount-table changes cheaply so repeated
/// polling does not re-parse the table every cycle, and collects capacity
/// (`statvfs`) and I/O-activity statistics with a strategy matched to the
/// filesystem's classification (local block device, NFS, CIFS, ZFS pool,
/// or virtual). A sibling module implements the fail2ban liveness probe.
pub mod activity;
pub mod device;
pub mod error;
pub mod filesystem;
pub mod fsutil;
pub mod mounttab;
pub mod probe;
pub mod statistics;
pub mod usage;

/// Runs the monitoring daemon: one poll cycle per second over the given
/// mountpoint targets, emitting one JSON object per filesystem per cycle
/// on stdout.
///
/// Transient conditions (a target that is currently unmounted) are logged
/// at debug level and retried; environmental failures are logged as
/// errors and retried next cycle as well; no backoff state is kept.
pub fn run(targets: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let mut platform = Platform::new(Mode::Daemon);
    let mut filesystems: Vec<(String, FilesystemInfo)> = targets
        .iter()
        .map(|target| (target.clone(), FilesystemInfo::default()))
        .collect();
    log::debug!("monitoring {} filesystem(s)", filesystems.len());

    loop {
        for (target, info) in &mut filesystems {
            match filesystem::collect_by_mountpoint(&mut platform, info, target) {
                Ok(()) => {
                    let payload = serde_json::json!({
                        "target": target,
                        "filesystem": info,
                    });
                    if let Some(line) = serde_json::to_string(&payload).ok_log() {
                        println!("{line}");
                    }
                }
                Err(err) if err.is_transient() => log::debug!("{err}"),
                Err(err) => log::error!("{err}"),
            }
        }
        std::thread::sleep(Duration::from_secs(1));
    }
}
