//! Lookup in the Solaris instance-mapping table `/etc/path_to_inst`.
//!
//! Each mapping line has the form
//!
//! ```text
//! "/pci@0,0/pci15ad,1976@10/sd@0,0" 0 "sd"
//! ```
//!
//! quoting the physical device path, the instance number, and the driver
//! module. Kernel I/O statistics are keyed by module + instance, not by
//! device node path, so resolving a block device on Solaris requires this
//! cross-reference.

use std::io::BufRead;

/// Scans the table for `physical_path` and returns its
/// `(instance, module)` pair.
///
/// Comment lines and lines that do not match the quoted layout are
/// skipped, matching the kernel tooling's tolerance for them.
///
/// # Errors
///
/// Returns an I/O error if reading the table fails.
pub fn lookup<R: BufRead>(
    mut reader: R,
    physical_path: &str,
) -> std::io::Result<Option<(u32, String)>> {
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if let Some((path, instance, module)) = parse_line(&line) {
            if path == physical_path {
                return Ok(Some((instance, module.to_owned())));
            }
        }
    }
}

fn parse_line(line: &str) -> Option<(&str, u32, &str)> {
    let mut parts = line.split('"');
    parts.next()?; // text before the first quote
    let path = parts.next()?;
    let instance: u32 = parts.next()?.trim().parse().ok()?;
    let module = parts.next()?;
    Some((path, instance, module))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
#
#       Caution! This file contains critical kernel state
#
\"/pci@0,0/pci15ad,1976@10/sd@0,0\" 0 \"sd\"
\"/pci@0,0/pci15ad,1976@10/sd@1,0\" 1 \"sd\"
\"/pci@0,0/pci-ide@7,1/ide@0/cmdk@0,0\" 0 \"cmdk\"
";

    #[test]
    fn finds_instance_and_module() {
        let hit = lookup(TABLE.as_bytes(), "/pci@0,0/pci15ad,1976@10/sd@1,0").unwrap();
        assert_eq!(hit, Some((1, "sd".to_owned())));
    }

    #[test]
    fn misses_yield_none() {
        let hit = lookup(TABLE.as_bytes(), "/pci@0,0/nonexistent@0,0").unwrap();
        assert_eq!(hit, None);
    }

    #[test]
    fn comment_lines_are_skipped() {
        // A comment containing quotes must not be mistaken for a mapping.
        let table = "# \"/bogus@0,0\" not a mapping\n\"/real@0,0\" 7 \"sd\"\n";
        let hit = lookup(table.as_bytes(), "/real@0,0").unwrap();
        assert_eq!(hit, Some((7, "sd".to_owned())));
    }
}
