//! Per-key cache coherency: at most one resolution in flight per normalized
//! key, with the index and durable store consulted before any provider.

use crate::crossref::resolve_target;
use crate::gateway::ProviderGateway;
use crosstune_cache::Repository;
use crosstune_music::{Classified, DurableRecord, ResolutionResult};
use crosstune_storage::{Pointer, StoreHandle};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared, WeakShared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use time::{Duration, UtcDateTime};
use tracing::{debug, info, instrument, warn};

/// Default freshness window for cache entries.
pub const DEFAULT_FRESHNESS: Duration = Duration::days(7);

/// Where a [`Lookup`] result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupSource {
    /// A fresh index entry and a readable durable record.
    Cache,
    /// This lookup ran the resolution (miss, stale entry or self-heal).
    Resolved,
    /// Another lookup for the same key was already in flight; this one
    /// waited for it.
    Coalesced,
}

/// The outcome of one coordinated lookup.
#[derive(Debug, Clone)]
pub struct Lookup {
    /// `None` if nothing could be resolved.
    pub result: Option<ResolutionResult>,
    pub source: LookupSource,
}

type Outcome = (Option<ResolutionResult>, LookupSource);
type InFlight = Shared<BoxFuture<'static, Outcome>>;

/// Coordinates the index, the durable store and the provider gateway.
///
/// Cloning is cheap and clones share the in-flight table, so every clone
/// coalesces with every other.
#[derive(Clone)]
pub struct CacheCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    gateway: ProviderGateway,
    index: Repository,
    store: StoreHandle,
    freshness: Duration,
    // Weak handles: once every waiter for a key is dropped, its resolution is
    // cancelled and the next lookup starts over.
    in_flight: Mutex<HashMap<String, WeakShared<BoxFuture<'static, Outcome>>>>,
}

impl CacheCoordinator {
    pub fn new(gateway: ProviderGateway, index: Repository, store: StoreHandle, freshness: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                gateway,
                index,
                store,
                freshness,
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn gateway(&self) -> &ProviderGateway {
        &self.inner.gateway
    }

    pub fn freshness(&self) -> Duration {
        self.inner.freshness
    }

    /// Look up one classified input, resolving it if the cache can't answer.
    ///
    /// Concurrent lookups for the same key share a single resolution. The
    /// returned result carries the input's raw link, and the provider the
    /// input linked to (if any) is marked primary.
    #[instrument(skip_all, fields(key = %input.key))]
    pub async fn lookup(&self, input: &Classified) -> Lookup {
        let (shared, leader) = self.join_or_start(input);
        let (mut result, source) = shared.clone().await;
        self.settle(&input.key, &shared);

        if let Some(result) = result.as_mut() {
            if let Some(provider) = input.provider() {
                result.mark_primary(provider);
            }
            result.add_link(input.raw.clone());
        }
        let source = match leader {
            true => source,
            false => LookupSource::Coalesced,
        };
        Lookup { result, source }
    }

    /// Join the resolution in flight for this key, or register a new one.
    /// Test-and-set happens under a single lock.
    fn join_or_start(&self, input: &Classified) -> (InFlight, bool) {
        let mut in_flight = self.inner.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = in_flight.get(&input.key).and_then(WeakShared::upgrade) {
            debug!("joining in-flight resolution");
            return (existing, false);
        }
        // Resolutions whose every waiter was dropped never settle.
        in_flight.retain(|_, weak| weak.upgrade().is_some());
        let inner = Arc::clone(&self.inner);
        let owned = input.clone();
        let shared = async move { inner.run(&owned).await }.boxed().shared();
        if let Some(weak) = shared.downgrade() {
            in_flight.insert(input.key.clone(), weak);
        }
        (shared, true)
    }

    /// Forget a settled resolution, unless the key has since been taken over
    /// by a newer one.
    fn settle(&self, key: &str, settled: &InFlight) {
        let mut in_flight = self.inner.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        let superseded = match in_flight.get(key).map(WeakShared::upgrade) {
            None => return,
            Some(Some(current)) => !current.ptr_eq(settled),
            Some(None) => false,
        };
        if !superseded {
            in_flight.remove(key);
        }
    }
}

impl Inner {
    async fn run(&self, input: &Classified) -> Outcome {
        let now = UtcDateTime::now();
        let entry = match self.index.get_by_normalized_link(&input.key).await {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %*err, "index read failed, treating as a miss");
                None
            },
        };

        // Pointer of an existing entry, and its record if it could be read.
        let mut previous: Option<(Pointer, Option<DurableRecord>)> = None;
        if let Some(entry) = entry {
            let record = match self.store.read(&entry.pointer).await {
                Ok(record) => record.filter(|r| !r.is_empty()),
                Err(err) => {
                    warn!(pointer = %entry.pointer, error = %*err, "durable record unreadable");
                    None
                },
            };
            match (entry.is_fresh(now, self.freshness), record) {
                (true, Some(record)) => {
                    debug!(pointer = %entry.pointer, "cache hit");
                    if let Err(err) = self.index.touch(&input.key, now).await {
                        warn!(error = %*err, "failed to refresh cache entry");
                    }
                    return (Some(ResolutionResult::from_record(&record)), LookupSource::Cache);
                },
                (true, None) => {
                    warn!(pointer = %entry.pointer, "fresh entry without a durable record, re-resolving");
                    previous = Some((entry.pointer, None));
                },
                (false, record) => {
                    debug!(pointer = %entry.pointer, age = %entry.age(now), "stale entry, re-resolving");
                    previous = Some((entry.pointer, record));
                },
            }
        }

        let Some(result) = resolve_target(&self.gateway, &input.target).await.filter(|r| !r.is_empty()) else {
            info!(input = %input, "no result");
            return (None, LookupSource::Resolved);
        };
        info!(input = %input, providers = result.len(), "resolved");
        self.persist(&input.key, &result, previous, now).await;
        (Some(result), LookupSource::Resolved)
    }

    /// Write the durable record and point the key at it. Failures are logged
    /// and otherwise ignored: the caller gets its result regardless.
    async fn persist(
        &self,
        key: &str,
        result: &ResolutionResult,
        previous: Option<(Pointer, Option<DurableRecord>)>,
        now: UtcDateTime,
    ) {
        let record = result.to_record(now);
        let identity = record.identity();
        let reusable = previous
            .as_ref()
            .and_then(|(pointer, old)| old.as_ref().filter(|old| old.identity() == identity).map(|_| pointer));

        let pointer = match reusable {
            Some(pointer) => match self.store.update(pointer, &record).await {
                Ok(()) => Some(pointer.clone()),
                Err(err) => {
                    warn!(%pointer, error = %*err, "failed to update durable record, creating a new one");
                    self.create(&record).await
                },
            },
            None => self.create(&record).await,
        };
        let Some(pointer) = pointer else {
            return;
        };
        if let Some((old, _)) = &previous
            && *old != pointer
        {
            info!(%key, from = %old, to = %pointer, "repointing cache entry");
        }
        if let Err(err) = self.index.upsert(&[key.to_string()], &pointer, now).await {
            warn!(%key, error = %*err, "failed to index durable record");
        }
    }

    async fn create(&self, record: &DurableRecord) -> Option<Pointer> {
        match self.store.create(record).await {
            Ok(pointer) => Some(pointer),
            Err(err) => {
                warn!(store = self.store.name(), error = %*err, "failed to write durable record");
                None
            },
        }
    }
}
