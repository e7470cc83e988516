use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// An explicitly requested configuration file doesn't exist.
    #[display("configuration file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// The file extension doesn't map to a supported format.
    #[display("unsupported configuration format: {}", _0.display())]
    UnsupportedFormat(#[error(not(source))] PathBuf),
    /// A layer couldn't be parsed or a value has the wrong type.
    #[display("could not load configuration")]
    Load,
    #[display("{_0} must be greater than zero")]
    Zero(#[error(not(source))] &'static str),
    #[display("no providers enabled")]
    NoProviders,
    #[display("unknown provider: {_0}")]
    UnknownProvider(#[error(not(source))] String),
    #[display("invalid market: {_0}")]
    InvalidMarket(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Configuration errors never fix themselves.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
