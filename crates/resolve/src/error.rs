//! Resolution Error Types
//!
//! Provider failures, cache misses and persistence failures are all absorbed
//! where they happen. What's left to propagate are contract violations by the
//! caller.

use derive_more::{Display, Error};

/// A resolution error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for resolution operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The caller supplied input that can never resolve (empty text, empty
    /// title, and so on).
    #[display("invalid input: {_0}")]
    InvalidInput(#[error(not(source))] String),
    #[display("configuration rejected")]
    Config,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::InvalidInput(_) | Self::Config => false,
        }
    }
}
