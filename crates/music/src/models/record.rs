use time::UtcDateTime;

use super::result::identity_of;
use super::{ProviderResult, WorkIdentity};

/// The provider-agnostic payload written to the durable store.
///
/// Never carries input links or primary flags; those belong to a single
/// request, not to the work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurableRecord {
    pub looked_up_at: UtcDateTime,
    pub results: Vec<ProviderResult>,
}
impl DurableRecord {
    pub fn new(looked_up_at: UtcDateTime, results: Vec<ProviderResult>) -> Self {
        Self { looked_up_at, results }
    }

    /// The work identity this record is stored under. `None` for an empty
    /// record, which is never written.
    pub fn identity(&self) -> Option<WorkIdentity> {
        identity_of(self.results.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Identifier, Provider};

    #[test]
    fn test_identity_uses_first_identifier_in_order() {
        let record = DurableRecord::new(
            UtcDateTime::UNIX_EPOCH,
            vec![
                ProviderResult::new(Provider::Spotify, "A", "B", "https://open.spotify.com/album/1"),
                ProviderResult::new(Provider::Deezer, "A", "B", "https://www.deezer.com/album/1").with_identifier("0602537518357"),
            ],
        );
        assert_eq!(
            record.identity(),
            Some(WorkIdentity::Identifier(Identifier::Upc("0602537518357".to_string())))
        );
    }

    #[test]
    fn test_empty_record_has_no_identity() {
        let record = DurableRecord::new(UtcDateTime::UNIX_EPOCH, Vec::new());
        assert!(record.is_empty());
        assert_eq!(record.identity(), None);
    }
}
