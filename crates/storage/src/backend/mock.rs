//! In-memory durable store for testing.

use crate::error::{ErrorKind, Result};
use crate::{DurableStore, Pointer};
use async_trait::async_trait;
use crosstune_music::DurableRecord;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// In-memory durable store for testing.
///
/// Records are stored in a `HashMap` behind a [`RwLock`], so all trait
/// methods can operate on `&self` without external synchronisation. Every
/// call is counted, and reads or writes can be switched to fail on demand to
/// exercise the self-healing and error-swallowing paths of callers.
///
/// # Examples
///
/// ```
/// use crosstune_music::{DurableRecord, Provider, ProviderResult};
/// use crosstune_storage::backend::{DurableStore, MockStore};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MockStore::default();
/// let record = DurableRecord::new(
///     time::UtcDateTime::now(),
///     vec![ProviderResult::new(Provider::Tidal, "Artist", "Title", "https://tidal.com/track/1")],
/// );
/// let pointer = store.create(&record).await?;
/// assert!(store.read(&pointer).await?.is_some());
/// assert_eq!(store.create_count(), 1);
///
/// store.fail_reads(true);
/// assert!(store.read(&pointer).await.is_err());
/// # Ok(())
/// # }
/// ```
pub struct MockStore {
    name: String,
    records: RwLock<HashMap<Pointer, DurableRecord>>,
    creates: AtomicUsize,
    reads: AtomicUsize,
    updates: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MockStore {
    /// Create a mock store pre-populated with records.
    pub fn with_records(records: impl IntoIterator<Item = (Pointer, DurableRecord)>) -> Self {
        Self {
            name: "mock".to_string(),
            records: RwLock::new(records.into_iter().collect()),
            creates: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Change the name of the mock store.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Make every subsequent read fail (or stop failing).
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent create/update fail (or stop failing).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Peek at a stored record without counting a read.
    pub async fn get(&self, pointer: &Pointer) -> Option<DurableRecord> {
        self.records.read().await.get(pointer).cloned()
    }

    /// Drop a record, simulating a pointer that went stale behind the index's back.
    pub async fn remove(&self, pointer: &Pointer) -> Option<DurableRecord> {
        self.records.write().await.remove(pointer)
    }

    fn check_writable(&self) -> Result<()> {
        match self.fail_writes.load(Ordering::SeqCst) {
            true => exn::bail!(ErrorKind::BackendError(format!("{}: writes disabled", self.name))),
            false => Ok(()),
        }
    }
}
impl Default for MockStore {
    fn default() -> Self {
        let records: [(Pointer, DurableRecord); 0] = [];
        Self::with_records(records)
    }
}

#[async_trait]
impl DurableStore for MockStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create(&self, record: &DurableRecord) -> Result<Pointer> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;
        let Some(identity) = record.identity() else {
            exn::bail!(ErrorKind::EmptyRecord);
        };
        let pointer = Pointer::for_identity(&identity);
        self.records.write().await.insert(pointer.clone(), record.clone());
        Ok(pointer)
    }

    async fn read(&self, pointer: &Pointer) -> Result<Option<DurableRecord>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::BackendError(format!("{}: reads disabled", self.name)));
        }
        Ok(self.records.read().await.get(pointer).cloned())
    }

    async fn update(&self, pointer: &Pointer, record: &DurableRecord) -> Result<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;
        if record.is_empty() {
            exn::bail!(ErrorKind::EmptyRecord);
        }
        match self.records.write().await.get_mut(pointer) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            },
            None => exn::bail!(ErrorKind::NotFound(pointer.to_string())),
        }
    }
}
