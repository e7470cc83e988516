//! Pointers into the durable store.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;

use crosstune_music::WorkIdentity;

use crate::error::{ErrorKind, Result};

/// Opaque name of a record in a durable store.
///
/// Pointers read back from the index are arbitrary strings, so anything that
/// turns a pointer into a location must go through [`Pointer::validate`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pointer(String);
impl Pointer {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Content-addressed pointer: the BLAKE3 hash of the work identity. The
    /// same work always maps to the same pointer.
    ///
    /// ```
    /// use crosstune_music::{Identifier, WorkIdentity};
    /// use crosstune_storage::Pointer;
    ///
    /// let identity = WorkIdentity::Identifier(Identifier::isrc("USRC17607839").unwrap());
    /// assert_eq!(Pointer::for_identity(&identity), Pointer::for_identity(&identity.clone()));
    /// assert_eq!(Pointer::for_identity(&identity).as_str().len(), 64);
    /// ```
    pub fn for_identity(identity: &WorkIdentity) -> Self {
        Self(blake3::hash(identity.key().as_bytes()).to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Ensures the pointer is safe to use as a file name: ASCII alphanumerics,
    /// `-` and `_` only, at least two characters (used for sharding).
    pub fn validate(&self) -> Result<&str> {
        let valid = self.0.len() >= 2 && self.0.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        match valid {
            true => Ok(&self.0),
            false => exn::bail!(ErrorKind::InvalidPointer(self.0.clone())),
        }
    }

    /// Relative location of the record: `<first two chars>/<pointer>.json`.
    pub(crate) fn relative_path(&self) -> Result<PathBuf> {
        let pointer = self.validate()?;
        Ok(PathBuf::from(&pointer[..2]).join(format!("{pointer}.json")))
    }
}
impl Display for Pointer {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}
impl From<String> for Pointer {
    fn from(value: String) -> Self {
        Self(value)
    }
}
impl AsRef<str> for Pointer {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
