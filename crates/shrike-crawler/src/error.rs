use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),
}

pub type Result<T> = std::result::Result<T, Error>;
