use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use crate::error::{Error, ErrorKind};

/// Storefront region a provider result was looked up in (ISO 3166-1
/// alpha-2, lowercase).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Market([u8; 2]);
impl Market {
    pub const US: Market = Market(*b"us");

    pub fn as_str(&self) -> &str {
        // Infallible: only ever constructed from two ASCII letters.
        std::str::from_utf8(&self.0).unwrap_or("us")
    }
}
impl Default for Market {
    fn default() -> Self {
        Self::US
    }
}
impl FromStr for Market {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.as_bytes() {
            [a, b] if a.is_ascii_alphabetic() && b.is_ascii_alphabetic() => {
                Ok(Self([a.to_ascii_lowercase(), b.to_ascii_lowercase()]))
            },
            _ => exn::bail!(ErrorKind::InvalidMarket(s.to_string())),
        }
    }
}
impl Display for Market {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}
