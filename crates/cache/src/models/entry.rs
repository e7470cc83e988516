use crate::error::{Error, ErrorKind};
use crosstune_storage::Pointer;
use exn::ResultExt;
use std::collections::BTreeSet;
use time::{Duration, UtcDateTime};

#[derive(sqlx::FromRow)]
pub(crate) struct EntryRow {
    pub id: i64,
    pub pointer: String,
    pub created_at: i64,
    pub last_looked_up_at: i64,
}

/// A pointer into the durable store, plus every normalized input link that
/// leads to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheIndexEntry {
    pub pointer: Pointer,
    pub created_at: UtcDateTime,
    pub last_looked_up_at: UtcDateTime,
    pub links: BTreeSet<String>,
}
impl CacheIndexEntry {
    /// Fresh iff `now - last_looked_up_at <= window`. The edge counts as fresh.
    pub fn is_fresh(&self, now: UtcDateTime, window: Duration) -> bool {
        now - self.last_looked_up_at <= window
    }

    /// Time since the entry was last looked up (negative if the clock moved backwards).
    pub fn age(&self, now: UtcDateTime) -> Duration {
        now - self.last_looked_up_at
    }

    pub(crate) fn from_row(row: EntryRow, links: impl IntoIterator<Item = String>) -> Result<Self, Error> {
        Ok(Self {
            pointer: Pointer::new(row.pointer),
            created_at: UtcDateTime::from_unix_timestamp(row.created_at)
                .or_raise(|| ErrorKind::InvalidData("creation date"))?,
            last_looked_up_at: UtcDateTime::from_unix_timestamp(row.last_looked_up_at)
                .or_raise(|| ErrorKind::InvalidData("last lookup date"))?,
            links: links.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn entry(last_looked_up_at: i64) -> CacheIndexEntry {
        let row = EntryRow {
            id: 1,
            pointer: "abcdef".to_string(),
            created_at: 1_000,
            last_looked_up_at,
        };
        CacheIndexEntry::from_row(row, ["open.spotify.com/track/abc123".to_string()]).unwrap()
    }

    #[rstest]
    #[case(1_000, true)]
    #[case(1_000 + 604_800, true)]
    #[case(1_000 + 604_801, false)]
    #[case(0, true)]
    fn test_freshness_is_inclusive(#[case] now: i64, #[case] fresh: bool) {
        let now = UtcDateTime::from_unix_timestamp(now).unwrap();
        assert_eq!(entry(1_000).is_fresh(now, Duration::days(7)), fresh);
    }

    #[test]
    fn test_row_to_model() {
        let entry = entry(2_000);
        assert_eq!(entry.pointer.as_str(), "abcdef");
        assert_eq!(entry.created_at.unix_timestamp(), 1_000);
        assert_eq!(entry.age(UtcDateTime::from_unix_timestamp(2_060).unwrap()), Duration::minutes(1));
        assert!(entry.links.contains("open.spotify.com/track/abc123"));
    }
}
