use std::path::PathBuf;

use crate::fsutil;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The target has no entry in the mount table. Expected transiently
    /// during mount/unmount races; never escalated as fatal.
    #[error("`{target}` not found in mount table")]
    NotFound { target: String },

    /// The mount source exists but no statistics key can be derived from it
    /// (no unit number in the name, unexpected device-tree shape, missing
    /// instance mapping).
    #[error("mount source `{device}` is not a recognizable device node")]
    UnresolvableDevice { device: String },

    #[error(transparent)]
    Canonicalize(#[from] fsutil::CanonicalizeError),

    #[error(transparent)]
    InstanceMapOpen(#[from] fsutil::FileOpenError),

    #[error("failed to read instance map `{path}`: {source}")]
    InstanceMapRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
