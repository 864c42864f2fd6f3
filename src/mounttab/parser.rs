//! Text parsers for file-based mount tables.
//!
//! Two layouts are covered:
//!
//! - the mtab format used by Linux `/proc/self/mounts` (and historically
//!   `/etc/mtab`): whitespace-separated
//!   `device mountpoint type options freq passno`, with whitespace and
//!   backslashes inside the first two fields encoded as three-digit octal
//!   escapes (`\040` for space, `\011` tab, `\012` newline, `\134`
//!   backslash);
//! - the Solaris `/etc/mnttab` format: tab-separated
//!   `special mount_point fstype options time`, where the options carry a
//!   `dev=<hex>` entry holding the mount's device id.

use super::MountEntry;

/// Named fields of a mount-table line.
#[derive(Debug)]
pub enum MountField {
    Device,
    MountPoint,
    FsType,
    Options,
}

impl std::fmt::Display for MountField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MountField::Device => "device",
            MountField::MountPoint => "mount_point",
            MountField::FsType => "fs_type",
            MountField::Options => "options",
        };
        write!(f, "{name}")
    }
}

/// Errors that may occur when parsing a mount-table line.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("missing `{field}` in line: `{line}`")]
    MissingField { field: MountField, line: String },
}

/// Decodes the three-digit octal escapes the kernel uses for whitespace in
/// mtab fields. Sequences that are not a backslash followed by exactly
/// three octal digits are kept as-is.
fn unescape_octal(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let bytes = field.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() {
            let digits = &field[i + 1..i + 4];
            if digits.bytes().all(|d| (b'0'..=b'7').contains(&d)) {
                let value = digits
                    .bytes()
                    .fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
                if let Some(c) = char::from_u32(value) {
                    out.push(c);
                    i += 4;
                    continue;
                }
            }
        }
        let c = field[i..].chars().next().expect("index lies on a char boundary");
        out.push(c);
        i += c.len_utf8();
    }
    out
}

fn missing(field: MountField, line: &str) -> ParseError {
    ParseError::MissingField {
        field,
        line: line.trim_end().to_owned(),
    }
}

/// Parses a single mtab-format line.
///
/// # Returns
///
/// `Ok(None)` for blank and comment lines, `Ok(Some(entry))` otherwise.
///
/// # Errors
///
/// Returns [`ParseError::MissingField`] when one of the four required
/// fields is absent. The trailing dump/pass fields are ignored.
pub fn parse_mtab_line(line: &str) -> Result<Option<MountEntry>, ParseError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let mut fields = trimmed.split_whitespace();
    let device = fields
        .next()
        .ok_or_else(|| missing(MountField::Device, line))?;
    let mountpoint = fields
        .next()
        .ok_or_else(|| missing(MountField::MountPoint, line))?;
    let fstype = fields
        .next()
        .ok_or_else(|| missing(MountField::FsType, line))?;
    let options = fields
        .next()
        .ok_or_else(|| missing(MountField::Options, line))?;

    Ok(Some(MountEntry {
        device: unescape_octal(device),
        mountpoint: unescape_octal(mountpoint),
        fstype: fstype.to_owned(),
        options: options.to_owned(),
    }))
}

/// Parses a single Solaris `/etc/mnttab` line (tab-separated fields).
///
/// # Returns
///
/// `Ok(None)` for blank lines, `Ok(Some(entry))` otherwise.
///
/// # Errors
///
/// Returns [`ParseError::MissingField`] when one of the four leading fields
/// is absent. The trailing mount-time field is ignored.
pub fn parse_mnttab_line(line: &str) -> Result<Option<MountEntry>, ParseError> {
    let trimmed = line.trim_end_matches(['\r', '\n']);
    if trimmed.trim().is_empty() {
        return Ok(None);
    }

    let mut fields = trimmed.split('\t');
    let device = fields
        .next()
        .filter(|f| !f.is_empty())
        .ok_or_else(|| missing(MountField::Device, line))?;
    let mountpoint = fields
        .next()
        .filter(|f| !f.is_empty())
        .ok_or_else(|| missing(MountField::MountPoint, line))?;
    let fstype = fields
        .next()
        .filter(|f| !f.is_empty())
        .ok_or_else(|| missing(MountField::FsType, line))?;
    let options = fields
        .next()
        .ok_or_else(|| missing(MountField::Options, line))?;

    Ok(Some(MountEntry {
        device: device.to_owned(),
        mountpoint: mountpoint.to_owned(),
        fstype: fstype.to_owned(),
        options: options.to_owned(),
    }))
}

/// Extracts the minor device number from a Solaris `dev=<hex>` mount
/// option. The low 18 bits of the device id are the minor number on a
/// 32-bit Solaris `dev_t`.
pub fn device_minor(options: &str) -> Option<u32> {
    let hex = options
        .split(',')
        .find_map(|opt| opt.strip_prefix("dev="))?;
    let dev = u32::from_str_radix(hex, 16).ok()?;
    Some(dev & 0x3ffff)
}
