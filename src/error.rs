#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("No {key} found")]
    MissingToken { key: &'static str },
    #[error("Identity token decode error: {0}")]
    Decode(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{operation} failed (status {status:?}): {detail}")]
    OAuth {
        operation: &'static str,
        status: Option<u16>,
        detail: String,
    },
    #[error("Session store error: {0}")]
    Store(String),
    #[error("Configuration error: {0}")]
    Config(String),
}
