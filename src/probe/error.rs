#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("fail2ban ping command error: {source}")]
    Ping {
        #[source]
        source: std::io::Error,
    },

    #[error("fail2ban pong read error: {source}")]
    Pong {
        #[source]
        source: std::io::Error,
    },

    #[error("fail2ban pong response mismatch")]
    UnexpectedResponse,
}

pub type Result<T> = std::result::Result<T, Error>;
