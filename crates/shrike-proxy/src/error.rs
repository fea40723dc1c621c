use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid proxy route: {0}")]
    Route(String),

    #[error("Relay error: {0}")]
    Relay(String),

    #[error("Upstream connect failed: {0}")]
    Upstream(std::io::Error),

    #[error("Malformed request header block")]
    MalformedHeader,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
