use crate::coordinator::CacheCoordinator;
use crate::error::{ErrorKind, Result};
use crate::gateway::{AdapterHandle, ProviderGateway};
use crate::stream::{BatchEvent, DEFAULT_CONCURRENCY, resolve_batch};
use crosstune_cache::Repository;
use crosstune_config::Config;
use crosstune_music::{Classified, IdentifierKind, ResolutionResult, classify};
use crosstune_storage::StoreHandle;
use futures::Stream;
use tracing::{debug, instrument};

/// The public entry points: free text in, cross-platform results out.
#[derive(Clone)]
pub struct Resolver {
    coordinator: CacheCoordinator,
    concurrency: usize,
}
impl Resolver {
    pub fn new(coordinator: CacheCoordinator) -> Self {
        Self { coordinator, concurrency: DEFAULT_CONCURRENCY }
    }

    /// Wire a resolver from configuration: enabled providers, timeout and
    /// market for the gateway, freshness for the cache, and batch
    /// concurrency.
    pub fn from_config(
        config: &Config,
        adapters: impl IntoIterator<Item = AdapterHandle>,
        index: Repository,
        store: StoreHandle,
    ) -> Result<Self> {
        let gateway = ProviderGateway::from_config(config, adapters)?;
        let coordinator = CacheCoordinator::new(gateway, index, store, config.freshness());
        Ok(Self::new(coordinator).with_concurrency(config.batch.concurrency))
    }

    /// Maximum simultaneous resolutions per batch (at least one).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn coordinator(&self) -> &CacheCoordinator {
        &self.coordinator
    }

    /// Classify every link or identifier in `text` and stream their
    /// resolutions as each completes.
    ///
    /// Text without anything recognizable yields an empty stream. Only blank
    /// text is an error.
    #[instrument(skip_all, fields(text_len = text.len()))]
    pub fn resolve_batch(&self, text: &str) -> Result<impl Stream<Item = BatchEvent> + Send + use<>> {
        if text.trim().is_empty() {
            exn::bail!(ErrorKind::InvalidInput("empty text".to_string()));
        }
        let inputs = classify(text);
        debug!(inputs = inputs.len(), "classified");
        Ok(resolve_batch(self.coordinator.clone(), inputs, self.concurrency))
    }

    /// Resolve a bare ISRC or UPC on every provider.
    ///
    /// A malformed value can never match anything and resolves to `None`.
    #[instrument(skip(self))]
    pub async fn resolve_by_identifier(&self, kind: IdentifierKind, value: &str) -> Result<Option<ResolutionResult>> {
        if value.trim().is_empty() {
            exn::bail!(ErrorKind::InvalidInput(format!("empty {kind}")));
        }
        let Ok(identifier) = kind.parse(value) else {
            debug!("malformed identifier");
            return Ok(None);
        };
        Ok(self.coordinator.lookup(&Classified::identifier(identifier)).await.result)
    }

    /// Search every provider for a title/artist pair.
    #[instrument(skip(self))]
    pub async fn resolve_by_title_artist(&self, title: &str, artist: &str) -> Result<Option<ResolutionResult>> {
        if title.trim().is_empty() {
            exn::bail!(ErrorKind::InvalidInput("empty title".to_string()));
        }
        if artist.trim().is_empty() {
            exn::bail!(ErrorKind::InvalidInput("empty artist".to_string()));
        }
        Ok(self.coordinator.lookup(&Classified::search(artist.trim(), title.trim())).await.result)
    }
}
