//! Durable store trait and implementations.
//!
//! This module defines the `DurableStore` trait, which provides a unified
//! interface over wherever authoritative records live (local filesystem, an
//! in-memory map for tests, or a remote service behind its own adapter).

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalStore;
#[cfg(feature = "mock")]
pub use self::mock::MockStore;
use crate::Pointer;
use crate::error::Result;
use async_trait::async_trait;
use crosstune_music::DurableRecord;

/// Unified interface for durable record stores.
///
/// All operations are asynchronous: the store may well be on the other side
/// of a network. Stores only ever see [`DurableRecord`]s, which by
/// construction carry no input links and no primary flags.
///
/// # Examples
///
/// ```
/// use crosstune_music::DurableRecord;
/// use crosstune_storage::{Pointer, backend::DurableStore, error::Result};
///
/// async fn store_or_refresh(store: &dyn DurableStore, existing: Option<&Pointer>, record: &DurableRecord) -> Result<Pointer> {
///     match existing {
///         Some(pointer) => {
///             store.update(pointer, record).await?;
///             Ok(pointer.clone())
///         },
///         None => store.create(record).await,
///     }
/// }
/// ```
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Name of the configured store (used for logging only).
    fn name(&self) -> &str;

    /// Persist a new record and return the pointer it can be read back from.
    ///
    /// Returns [`EmptyRecord`](crate::error::ErrorKind::EmptyRecord) for a
    /// record without results.
    async fn create(&self, record: &DurableRecord) -> Result<Pointer>;

    /// Read the record at `pointer`.
    ///
    /// Unknown pointers are `Ok(None)`; an `Err` means the store could not be
    /// reached or the stored bytes could not be decoded.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use crosstune_storage::{Pointer, backend::DurableStore, error::Result};
    /// # async fn example(store: &dyn DurableStore) -> Result<()> {
    /// match store.read(&Pointer::new("af1349b9")).await? {
    ///     Some(record) => println!("{} results", record.results.len()),
    ///     None => println!("no such record"),
    /// }
    /// # Ok(())
    /// # }
    /// ```
    async fn read(&self, pointer: &Pointer) -> Result<Option<DurableRecord>>;

    /// Replace the record at an existing `pointer`.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if there is
    /// nothing to update.
    async fn update(&self, pointer: &Pointer, record: &DurableRecord) -> Result<()>;
}
