/// Entry point for the fsmon filesystem monitoring daemon.
///
/// This binary polls the filesystems mounted at the given targets once per
/// second, resolving each to its underlying device and emitting capacity
/// and I/O-activity statistics as JSON lines on stdout.
///
/// # Errors
///
/// Returns an error when no targets are given.
///
/// # Examples
///
/// ```bash
/// RUST_LOG=debug cargo run -- / /var /mnt/nfs
/// ```
fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let targets: Vec<String> = std::env::args().skip(1).collect();
    if targets.is_empty() {
        return Err("usage: fsmon <mountpoint>...".into());
    }
    fsmon::run(&targets)
}
