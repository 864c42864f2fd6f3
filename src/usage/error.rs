#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to get usage statistics for filesystem `{mountpoint}`: {source}")]
    Statvfs {
        mountpoint: String,
        #[source]
        source: nix::errno::Errno,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
