//! Cross-platform resolution of music links.
//!
//! Free text is classified into links and identifiers
//! ([`crosstune_music::classify`]), each is looked up through the
//! [`CacheCoordinator`] (index, durable store, then providers), and results
//! stream out as they complete, deduplicated by work identity.
//!
//! ```no_run
//! use crosstune_cache::{Database, Repository};
//! use crosstune_resolve::{CacheCoordinator, ProviderGateway, Resolver, collect_batch};
//! use crosstune_storage::backend::LocalStore;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::connect("/var/lib/crosstune/index.sqlite").await?;
//! let store = Arc::new(LocalStore::new("records", "/var/lib/crosstune/records")?);
//! let coordinator = CacheCoordinator::new(
//!     ProviderGateway::new(),
//!     Repository::from(&db),
//!     store,
//!     crosstune_resolve::coordinator::DEFAULT_FRESHNESS,
//! );
//! let resolver = Resolver::new(coordinator);
//! let results = collect_batch(resolver.resolve_batch("https://open.spotify.com/track/abc123")?).await;
//! # Ok(())
//! # }
//! ```

mod aggregate;
pub mod coordinator;
mod crossref;
pub mod error;
pub mod gateway;
mod resolver;
mod stream;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use crate::aggregate::{Accepted, Aggregator};
pub use crate::coordinator::{CacheCoordinator, Lookup, LookupSource};
pub use crate::crossref::{by_identifier, by_search, cross_reference, resolve_target};
pub use crate::gateway::{AdapterHandle, ProviderAdapter, ProviderGateway};
pub use crate::resolver::Resolver;
pub use crate::stream::{BatchEvent, DEFAULT_CONCURRENCY, collect_batch, resolve_batch};
