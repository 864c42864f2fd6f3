use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

/// Error that occurs when opening a file fails.
#[derive(Debug, thiserror::Error)]
#[error("failed to open file `{path}`: {source}")]
pub struct FileOpenError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Opens a file at the given path and wraps it in a [`BufReader`].
///
/// # Errors
///
/// Returns a [`FileOpenError`] if the file cannot be opened.
///
/// # Example
/// ```no_run
/// # use fsmon::fsutil;
/// let reader = fsutil::open_file_reader("/some/file.txt")?;
/// # Ok::<(), fsutil::FileOpenError>(())
/// ```
pub fn open_file_reader(path: impl AsRef<Path>) -> Result<BufReader<File>, FileOpenError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| FileOpenError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

/// Error that occurs when symlink-following canonicalization of an existing
/// path fails for a reason other than the path not existing.
#[derive(Debug, thiserror::Error)]
#[error("failed to canonicalize path `{path}`: {source}")]
pub struct CanonicalizeError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Resolves `path` through symlinks to its canonical form.
///
/// Mount sources such as device-mapper, LVM, and `by-id` paths are symlinks
/// to the canonical device node, so device comparison and device-name
/// derivation both go through this call.
///
/// # Returns
///
/// * `Ok(Some(canonical))` — the path exists; `canonical` is fully resolved.
/// * `Ok(None)` — the path does not name a filesystem object (`ENOENT` or
///   `ENOTDIR`). This is the expected outcome for virtual mount sources like
///   `tmpfs` or `proc` and is not an error.
///
/// # Errors
///
/// Returns a [`CanonicalizeError`] for any other failure (e.g. permission),
/// which callers treat as environmental rather than as a virtual mount.
pub fn canonicalize(path: impl AsRef<Path>) -> Result<Option<PathBuf>, CanonicalizeError> {
    let path = path.as_ref();
    match std::fs::canonicalize(path) {
        Ok(canonical) => Ok(Some(canonical)),
        Err(err)
            if matches!(
                err.kind(),
                io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
            ) =>
        {
            Ok(None)
        }
        Err(source) => Err(CanonicalizeError {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Returns the final component of a path as a string slice, if it has one.
pub fn base_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_open_file_reader_success() {
        let tmp = tempfile::NamedTempFile::new().expect("failed to create temp file");
        let path = tmp.path();
        let reader = open_file_reader(path).expect("should open test file");
        let metadata = reader.get_ref().metadata().unwrap();
        assert!(metadata.is_file());
    }

    #[test]
    fn test_open_file_reader_error() {
        let result = open_file_reader("/definitely/does/not/exist");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.path, PathBuf::from("/definitely/does/not/exist"));
        assert_eq!(err.source.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn test_canonicalize_follows_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("sda1");
        std::fs::write(&target, b"").unwrap();
        let link = dir.path().join("disk-by-id");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let canonical = canonicalize(&link).unwrap().expect("link target exists");
        assert_eq!(canonical.file_name().unwrap(), "sda1");
    }

    #[test]
    fn test_canonicalize_missing_path_is_not_an_error() {
        assert!(canonicalize("/no/such/device").unwrap().is_none());
        // A path component that is a regular file yields ENOTDIR.
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let inside = tmp.path().join("below-a-file");
        assert!(canonicalize(&inside).unwrap().is_none());
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name(Path::new("/dev/sda1")), Some("sda1"));
        assert_eq!(base_name(Path::new("sda1")), Some("sda1"));
        assert_eq!(base_name(Path::new("/")), None);
    }
}
