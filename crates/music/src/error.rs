//! Music Model Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A music model error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for parsing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Value is neither a canonical ISRC nor a canonical UPC.
    #[display("invalid identifier: {_0}")]
    InvalidIdentifier(#[error(not(source))] String),
    /// Provider tag is not one we know about.
    #[display("unknown provider: {_0}")]
    UnknownProvider(#[error(not(source))] String),
    /// Entity kind is not one we know about.
    #[display("unknown entity kind: {_0}")]
    UnknownEntityKind(#[error(not(source))] String),
    /// Market is not an ISO 3166-1 alpha-2 code.
    #[display("invalid market region: {_0}")]
    InvalidMarket(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Parsing is deterministic; the input is either valid or it isn't.
        false
    }
}
