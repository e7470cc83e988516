//! Local filesystem durable store.
//!
//! Records are JSON files under a configured root directory, sharded by the
//! first two characters of their pointer. Writes go through a temporary file
//! and a rename so readers never observe a partially written record.

use crate::error::{ErrorKind, Result};
use crate::{DurableStore, Pointer, decode, encode};
use async_trait::async_trait;
use crosstune_music::DurableRecord;
use std::fs::create_dir_all as sync_create_dir;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tracing::{debug, instrument};

/// Distinguishes temporary files of concurrent writers within this process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Local filesystem durable store.
///
/// # Examples
///
/// ```no_run
/// use crosstune_storage::backend::LocalStore;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = LocalStore::new("local", "/var/lib/crosstune/records")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalStore {
    name: String,
    /// Root directory for the records
    root: PathBuf,
}
impl LocalStore {
    /// Create a new local filesystem store.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute, or exists and is not a
    /// directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidRoot(root));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidRoot(root));
            }
        } else {
            // Non-async: only happens once on startup.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root))?;
        }
        Ok(Self { name: name.into(), root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn absolute_path(&self, pointer: &Pointer) -> Result<PathBuf> {
        Ok(self.root.join(pointer.relative_path()?))
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }

    async fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<()> {
        let parent = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, parent))?;
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("record");
        let temp = parent.join(format!(
            ".{file_name}.{}.{}.tmp",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        fs::write(&temp, data).await.map_err(|e| Self::map_io_error(e, &temp))?;
        if let Err(e) = fs::rename(&temp, path).await {
            // Best effort; the rename error is the one worth reporting.
            let _ = fs::remove_file(&temp).await;
            exn::bail!(Self::map_io_error(e, path));
        }
        Ok(())
    }
}

#[async_trait]
impl DurableStore for LocalStore {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, record), fields(store = %self.name))]
    async fn create(&self, record: &DurableRecord) -> Result<Pointer> {
        let Some(identity) = record.identity() else {
            exn::bail!(ErrorKind::EmptyRecord);
        };
        let pointer = Pointer::for_identity(&identity);
        let path = self.absolute_path(&pointer)?;
        self.write_atomic(&path, &encode(record)?).await?;
        debug!(%pointer, %identity, "created durable record");
        Ok(pointer)
    }

    #[instrument(skip(self), fields(store = %self.name))]
    async fn read(&self, pointer: &Pointer) -> Result<Option<DurableRecord>> {
        let path = self.absolute_path(pointer)?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => exn::bail!(Self::map_io_error(e, &path)),
        };
        Ok(Some(decode(&bytes)?))
    }

    #[instrument(skip(self, record), fields(store = %self.name))]
    async fn update(&self, pointer: &Pointer, record: &DurableRecord) -> Result<()> {
        if record.is_empty() {
            exn::bail!(ErrorKind::EmptyRecord);
        }
        let path = self.absolute_path(pointer)?;
        if !fs::try_exists(&path).await.map_err(|e| Self::map_io_error(e, &path))? {
            exn::bail!(ErrorKind::NotFound(pointer.to_string()));
        }
        self.write_atomic(&path, &encode(record)?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosstune_music::{Provider, ProviderResult};
    use time::UtcDateTime;

    fn record(title: &str) -> DurableRecord {
        DurableRecord::new(
            UtcDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
            vec![
                ProviderResult::new(Provider::Spotify, "Rick Astley", title, "https://open.spotify.com/track/abc123")
                    .with_identifier("USRC17607839"),
            ],
        )
    }

    #[test]
    fn test_new_requires_absolute_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(LocalStore::new("name", temp_dir.path()).is_ok());
        assert!(LocalStore::new("name", "relative/path").is_err());
        assert!(LocalStore::new("name", "./relative").is_err());
    }

    #[test]
    fn test_new_creates_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("nested/records");
        LocalStore::new("name", &root).unwrap();
        assert!(root.is_dir());
    }

    #[tokio::test]
    async fn test_create_and_read() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new("name", temp_dir.path()).unwrap();
        let pointer = store.create(&record("Never Gonna Give You Up")).await.unwrap();
        let path = temp_dir.path().join(&pointer.as_str()[..2]).join(format!("{pointer}.json"));
        assert!(path.is_file());
        assert_eq!(store.read(&pointer).await.unwrap(), Some(record("Never Gonna Give You Up")));
    }

    #[tokio::test]
    async fn test_create_is_content_addressed() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new("name", temp_dir.path()).unwrap();
        let first = store.create(&record("Never Gonna Give You Up")).await.unwrap();
        let second = store.create(&record("Never Gonna Give You Up (Remastered)")).await.unwrap();
        assert_eq!(first, second);
        let stored = store.read(&first).await.unwrap().unwrap();
        assert_eq!(stored.results[0].title, "Never Gonna Give You Up (Remastered)");
    }

    #[tokio::test]
    async fn test_read_unknown_pointer() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new("name", temp_dir.path()).unwrap();
        assert_eq!(store.read(&Pointer::new("deadbeef")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_corrupt_record_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new("name", temp_dir.path()).unwrap();
        let pointer = store.create(&record("Never Gonna Give You Up")).await.unwrap();
        std::fs::write(store.absolute_path(&pointer).unwrap(), b"{truncated").unwrap();
        let err = store.read(&pointer).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Encoding(_)));
    }

    #[tokio::test]
    async fn test_update_existing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new("name", temp_dir.path()).unwrap();
        let pointer = store.create(&record("Old")).await.unwrap();
        store.update(&pointer, &record("New")).await.unwrap();
        assert_eq!(store.read(&pointer).await.unwrap().unwrap().results[0].title, "New");
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new("name", temp_dir.path()).unwrap();
        let err = store.update(&Pointer::new("deadbeef"), &record("New")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_empty_record_is_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new("name", temp_dir.path()).unwrap();
        let empty = DurableRecord::new(UtcDateTime::now(), Vec::new());
        assert!(matches!(&*store.create(&empty).await.unwrap_err(), ErrorKind::EmptyRecord));
    }

    #[tokio::test]
    async fn test_pointer_cannot_escape_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new("name", temp_dir.path()).unwrap();
        assert!(store.read(&Pointer::new("../../etc/passwd")).await.is_err());
        assert!(store.update(&Pointer::new(".."), &record("x")).await.is_err());
    }

    #[tokio::test]
    async fn test_no_temporary_files_left_behind() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new("name", temp_dir.path()).unwrap();
        let pointer = store.create(&record("Never Gonna Give You Up")).await.unwrap();
        let shard = temp_dir.path().join(&pointer.as_str()[..2]);
        let entries: Vec<_> = std::fs::read_dir(shard).unwrap().map(|e| e.unwrap().file_name()).collect();
        assert_eq!(entries.len(), 1);
    }
}
