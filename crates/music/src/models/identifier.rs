use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use crate::error::{Error, ErrorKind};

/// The two standardized identifiers used to cross-reference providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierKind {
    /// International Standard Recording Code (tracks).
    Isrc,
    /// Universal Product Code / EAN-13 (albums).
    Upc,
}
impl IdentifierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierKind::Isrc => "isrc",
            IdentifierKind::Upc => "upc",
        }
    }

    /// Validate and canonicalize `value` as this kind of identifier.
    pub fn parse(&self, value: &str) -> Result<Identifier, Error> {
        match self {
            IdentifierKind::Isrc => Identifier::isrc(value),
            IdentifierKind::Upc => Identifier::upc(value),
        }
    }
}
impl FromStr for IdentifierKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "isrc" => Self::Isrc,
            "upc" | "ean" | "barcode" => Self::Upc,
            _ => exn::bail!(ErrorKind::InvalidIdentifier(s.to_string())),
        })
    }
}
impl Display for IdentifierKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// A canonical ISRC or UPC.
///
/// Only constructible through the validating parsers, so holding one means
/// the value is usable as a match key. Malformed values never make it this
/// far; callers treat them as absent.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Identifier {
    Isrc(String),
    Upc(String),
}
impl Identifier {
    /// Parse an ISRC: `CC-XXX-YY-NNNNN` (hyphens and surrounding whitespace
    /// are tolerated), stored uppercased without separators.
    pub fn isrc(value: &str) -> Result<Self, Error> {
        let canonical: String = value.trim().chars().filter(|c| *c != '-').collect::<String>().to_ascii_uppercase();
        let bytes = canonical.as_bytes();
        let valid = bytes.len() == 12
            && bytes[..2].iter().all(u8::is_ascii_alphabetic)
            && bytes[2..5].iter().all(u8::is_ascii_alphanumeric)
            && bytes[5..].iter().all(u8::is_ascii_digit);
        match valid {
            true => Ok(Self::Isrc(canonical)),
            false => exn::bail!(ErrorKind::InvalidIdentifier(value.to_string())),
        }
    }

    /// Parse a UPC-A (12 digits), EAN-13 (13 digits) or zero-padded GTIN-14
    /// (14 digits). Leading zeros are significant and kept.
    pub fn upc(value: &str) -> Result<Self, Error> {
        let canonical = value.trim();
        let valid = matches!(canonical.len(), 12..=14) && canonical.bytes().all(|b| b.is_ascii_digit());
        match valid {
            true => Ok(Self::Upc(canonical.to_string())),
            false => exn::bail!(ErrorKind::InvalidIdentifier(value.to_string())),
        }
    }

    /// Recognize a bare identifier by its shape alone.
    ///
    /// Purely numeric values are UPCs (a 12-digit value is a valid UPC-A and
    /// can never be a valid ISRC, which starts with a country code).
    pub fn detect(value: &str) -> Result<Self, Error> {
        let trimmed = value.trim();
        if trimmed.bytes().all(|b| b.is_ascii_digit()) {
            Self::upc(trimmed)
        } else {
            Self::isrc(trimmed)
        }
    }

    /// Parse an identifier reported by a provider, treating anything
    /// malformed (or empty) as absent.
    pub fn parse_lenient(value: &str) -> Option<Self> {
        if value.trim().is_empty() {
            return None;
        }
        match Self::detect(value) {
            Ok(identifier) => Some(identifier),
            Err(_) => {
                tracing::debug!(value, "discarding malformed identifier");
                None
            },
        }
    }

    pub fn kind(&self) -> IdentifierKind {
        match self {
            Identifier::Isrc(_) => IdentifierKind::Isrc,
            Identifier::Upc(_) => IdentifierKind::Upc,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Identifier::Isrc(v) | Identifier::Upc(v) => v,
        }
    }
}
impl FromStr for Identifier {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::detect(s)
    }
}
impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.value())
    }
}
