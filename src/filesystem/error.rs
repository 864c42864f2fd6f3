use crate::{activity, device, mounttab, usage};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transient: the target has no mount-table entry this cycle. Counters
    /// have been reset; the caller retries next cycle and logs at most at
    /// debug level.
    #[error("filesystem `{target}` is not mounted")]
    NotMounted { target: String },

    #[error(transparent)]
    MountTable(#[from] mounttab::Error),

    #[error(transparent)]
    Resolve(device::Error),

    #[error(transparent)]
    Usage(#[from] usage::Error),

    #[error(transparent)]
    Activity(#[from] activity::Error),
}

impl Error {
    /// Whether this is an expected, transient condition rather than an
    /// environmental failure.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::NotMounted { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
