//! Repository for index entries and the input links that point at them.
//!
//! Entries and links are tightly coupled: an entry without links is
//! unreachable, and a link without an entry is meaningless. All writes that
//! touch both happen inside one transaction.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{CacheIndexEntry, EntryRow};
use crosstune_storage::Pointer;
use exn::ResultExt;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::BTreeSet;
use time::UtcDateTime;
use tracing::{debug, instrument};

/// Repository for the link index.
///
/// # Relationships
///
/// - Many input links can reference the same entry (textually different
///   links, or different links to the same work)
/// - Each entry references exactly one durable pointer, and each pointer is
///   referenced by at most one entry
/// - An input link is never shared between two entries
/// - Deleting an entry cascades to delete its links
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
    dry_run: bool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone(), dry_run: false }
    }
}
impl Repository {
    /// Create a new repository with the given connection pool.
    ///
    /// A dry-run repository answers reads normally and silently skips writes.
    pub fn new(pool: SqlitePool, dry_run: bool) -> Self {
        Self { pool, dry_run }
    }

    // =========================================================================
    // Insert/Update
    // =========================================================================

    /// Point every link in `links` at `pointer`, stamping the entry as looked
    /// up at `looked_up_at`.
    ///
    /// Runs in a single transaction:
    /// - the entry already owning `pointer` is reused; otherwise the entry
    ///   owning the first known link is repointed in place (its `created_at`
    ///   is preserved) as long as every link it owns is in `links`; otherwise
    ///   a new entry is created,
    /// - every link is moved onto that entry,
    /// - entries left without any link are removed, since nothing can reach
    ///   them any more.
    #[instrument(skip_all, fields(%pointer, links = links.len()))]
    pub async fn upsert(
        &self,
        links: &[String],
        pointer: &Pointer,
        looked_up_at: UtcDateTime,
    ) -> Result<Option<CacheIndexEntry>> {
        if links.is_empty() {
            exn::bail!(ErrorKind::NoLinks);
        }
        if self.dry_run {
            return Ok(None);
        }
        let looked_up_at = looked_up_at.unix_timestamp();
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;

        let mut previous_entries = BTreeSet::new();
        for link in links {
            if let Some(id) = Self::entry_id_for_link(&mut *tx, link).await? {
                previous_entries.insert(id);
            }
        }
        let by_link = match links.first() {
            Some(first) => Self::entry_id_for_link(&mut *tx, first).await?,
            None => None,
        }
        .or_else(|| previous_entries.first().copied());
        let by_pointer: Option<EntryRow> = sqlx::query_as(include_str!("../queries/get_entry_by_pointer.sql"))
            .bind(pointer.as_str())
            .fetch_optional(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;

        let entry_id = match (by_link, by_pointer) {
            // Another entry already owns the pointer: fold the links into it.
            (_, Some(row)) => {
                Self::update_entry(&mut *tx, row.id, pointer, looked_up_at).await?;
                row.id
            },
            // Repoint in place only if no other link still expects the old
            // pointer; otherwise split the given links off onto a new entry.
            (Some(id), None) => {
                let owned = Self::links_for_entry(&mut *tx, id).await?;
                if owned.iter().all(|link| links.contains(link)) {
                    Self::update_entry(&mut *tx, id, pointer, looked_up_at).await?;
                    id
                } else {
                    debug!(entry_id = id, "splitting links off a shared entry");
                    Self::insert_entry(&mut *tx, pointer, looked_up_at).await?
                }
            },
            (None, None) => Self::insert_entry(&mut *tx, pointer, looked_up_at).await?,
        };

        for link in links {
            sqlx::query(include_str!("../queries/upsert_link.sql"))
                .bind(link.as_str())
                .bind(entry_id)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        for previous in previous_entries.into_iter().filter(|id| *id != entry_id) {
            let removed = sqlx::query(include_str!("../queries/delete_entry_if_orphaned.sql"))
                .bind(previous)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?
                .rows_affected();
            if removed > 0 {
                debug!(entry_id = previous, "removed entry left without links");
            }
        }
        let entry = Self::load_entry(&mut *tx, pointer).await?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(entry)
    }

    /// Bump `last_looked_up_at` of the entry owning `link`.
    ///
    /// Returns `false` if the link isn't indexed.
    #[instrument(skip(self))]
    pub async fn touch(&self, link: &str, looked_up_at: UtcDateTime) -> Result<bool> {
        if self.dry_run {
            return Ok(false);
        }
        let updated = sqlx::query(include_str!("../queries/touch_by_link.sql"))
            .bind(looked_up_at.unix_timestamp())
            .bind(link)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?
            .rows_affected();
        Ok(updated > 0)
    }

    // =========================================================================
    // Get/Fetch
    // =========================================================================

    /// Get the entry a normalized input link points at, with all of the
    /// entry's links.
    pub async fn get_by_normalized_link(&self, link: &str) -> Result<Option<CacheIndexEntry>> {
        let mut conn = self.pool.acquire().await.or_raise(|| ErrorKind::Database)?;
        let row: Option<EntryRow> = sqlx::query_as(include_str!("../queries/get_entry_by_link.sql"))
            .bind(link)
            .fetch_optional(&mut *conn)
            .await
            .or_raise(|| ErrorKind::Database)?;
        match row {
            Some(row) => {
                let links = Self::links_for_entry(&mut *conn, row.id).await?;
                Ok(Some(CacheIndexEntry::from_row(row, links)?))
            },
            None => Ok(None),
        }
    }

    /// List every input link indexed against a durable pointer.
    pub async fn list_links_for_pointer(&self, pointer: &Pointer) -> Result<Vec<String>> {
        sqlx::query_scalar(include_str!("../queries/list_links_for_pointer.sql"))
            .bind(pointer.as_str())
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    /// Number of entries (distinct durable pointers) in the index.
    pub async fn count_entries(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(include_str!("../queries/count_entries.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("entry count"))
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn entry_id_for_link(conn: &mut SqliteConnection, link: &str) -> Result<Option<i64>> {
        sqlx::query_scalar(include_str!("../queries/get_entry_id_by_link.sql"))
            .bind(link)
            .fetch_optional(&mut *conn)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    async fn insert_entry(conn: &mut SqliteConnection, pointer: &Pointer, looked_up_at: i64) -> Result<i64> {
        sqlx::query_scalar(include_str!("../queries/insert_entry.sql"))
            .bind(pointer.as_str())
            .bind(looked_up_at)
            .bind(looked_up_at)
            .fetch_one(&mut *conn)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    async fn update_entry(conn: &mut SqliteConnection, id: i64, pointer: &Pointer, looked_up_at: i64) -> Result<()> {
        sqlx::query(include_str!("../queries/update_entry.sql"))
            .bind(pointer.as_str())
            .bind(looked_up_at)
            .bind(id)
            .execute(&mut *conn)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    async fn links_for_entry(conn: &mut SqliteConnection, id: i64) -> Result<Vec<String>> {
        sqlx::query_scalar(include_str!("../queries/list_links_for_entry.sql"))
            .bind(id)
            .fetch_all(&mut *conn)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    async fn load_entry(conn: &mut SqliteConnection, pointer: &Pointer) -> Result<Option<CacheIndexEntry>> {
        let row: Option<EntryRow> = sqlx::query_as(include_str!("../queries/get_entry_by_pointer.sql"))
            .bind(pointer.as_str())
            .fetch_optional(&mut *conn)
            .await
            .or_raise(|| ErrorKind::Database)?;
        match row {
            Some(row) => {
                let links = Self::links_for_entry(conn, row.id).await?;
                Ok(Some(CacheIndexEntry::from_row(row, links)?))
            },
            None => Ok(None),
        }
    }
}
