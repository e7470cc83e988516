//! Uniform async contract over heterogeneous provider clients.

use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use crosstune_config::Config;
use crosstune_music::{EntityKind, Identifier, Market, Provider, ProviderResult};
use derive_more::{Display, Error};
use exn::ResultExt;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// A provider adapter error with automatic location tracking.
pub type AdapterError = exn::Exn<AdapterErrorKind>;
/// Result type alias for provider adapter calls.
pub type AdapterResult<T> = std::result::Result<T, AdapterError>;

/// Why a provider call produced nothing.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum AdapterErrorKind {
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    #[display("authentication failed")]
    Authentication,
    #[display("rate limited")]
    RateLimited,
    #[display("not found")]
    NotFound,
    #[display("invalid response: {_0}")]
    InvalidResponse(#[error(not(source))] String),
}
impl AdapterErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimited)
    }
}

/// The capability every provider client implements.
///
/// Adapters are free to return `Ok(None)` or
/// [`NotFound`](AdapterErrorKind::NotFound) for a miss; the gateway treats
/// both the same way.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use crosstune_music::{EntityKind, Identifier, Market, Provider, ProviderResult};
/// use crosstune_resolve::gateway::{AdapterErrorKind, AdapterResult, ProviderAdapter};
///
/// struct Offline;
///
/// #[async_trait]
/// impl ProviderAdapter for Offline {
///     fn provider(&self) -> Provider {
///         Provider::Deezer
///     }
///     async fn get_by_native_id(&self, _: EntityKind, _: &str, _: Market) -> AdapterResult<Option<ProviderResult>> {
///         exn::bail!(AdapterErrorKind::Network("offline".to_string()))
///     }
///     async fn get_by_identifier(&self, _: &Identifier, _: Market) -> AdapterResult<Option<ProviderResult>> {
///         Ok(None)
///     }
///     async fn search_by_title_artist(&self, _: &str, _: &str, _: Market) -> AdapterResult<Option<ProviderResult>> {
///         Ok(None)
///     }
/// }
/// ```
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// The provider this adapter talks to.
    fn provider(&self) -> Provider;

    /// Look up an entity by the provider's own identifier.
    async fn get_by_native_id(&self, kind: EntityKind, id: &str, market: Market)
    -> AdapterResult<Option<ProviderResult>>;

    /// Look up a track by ISRC or an album by UPC.
    async fn get_by_identifier(&self, identifier: &Identifier, market: Market) -> AdapterResult<Option<ProviderResult>>;

    /// Best match for a title/artist pair.
    async fn search_by_title_artist(
        &self,
        title: &str,
        artist: &str,
        market: Market,
    ) -> AdapterResult<Option<ProviderResult>>;
}

pub type AdapterHandle = Arc<dyn ProviderAdapter + Send + Sync>;

/// Registry of provider adapters, keyed by provider.
///
/// Every call is bounded by its own timeout. Failures of any kind are logged
/// and become `None`: the caller decides whether absence matters.
#[derive(Clone)]
pub struct ProviderGateway {
    adapters: BTreeMap<Provider, AdapterHandle>,
    timeout: Duration,
    market: Market,
}
impl Default for ProviderGateway {
    fn default() -> Self {
        Self::new()
    }
}
impl ProviderGateway {
    pub fn new() -> Self {
        Self {
            adapters: BTreeMap::new(),
            timeout: DEFAULT_TIMEOUT,
            market: Market::default(),
        }
    }

    /// A gateway over the configured providers, with the configured timeout
    /// and default market. Adapters for providers that aren't enabled are
    /// dropped.
    pub fn from_config(config: &Config, adapters: impl IntoIterator<Item = AdapterHandle>) -> Result<Self> {
        let enabled = config.enabled_providers().or_raise(|| ErrorKind::Config)?;
        let market = config.market().or_raise(|| ErrorKind::Config)?;
        let mut gateway = adapters
            .into_iter()
            .fold(Self::new(), |gateway, adapter| gateway.with_adapter(adapter));
        gateway.retain(&enabled);
        for provider in enabled.iter().filter(|p| !gateway.adapters.contains_key(*p)) {
            debug!(%provider, "enabled but no adapter available");
        }
        Ok(gateway.with_timeout(config.timeout()).with_market(market))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Market used when the input doesn't imply one.
    pub fn with_market(mut self, market: Market) -> Self {
        self.market = market;
        self
    }

    pub fn with_adapter(mut self, adapter: AdapterHandle) -> Self {
        self.register(adapter);
        self
    }

    /// Register an adapter, replacing (and returning) any previous adapter
    /// for the same provider.
    pub fn register(&mut self, adapter: AdapterHandle) -> Option<AdapterHandle> {
        self.adapters.insert(adapter.provider(), adapter)
    }

    /// Keep only adapters for the given providers.
    pub fn retain(&mut self, enabled: &[Provider]) {
        self.adapters.retain(|provider, _| enabled.contains(provider));
    }

    pub fn providers(&self) -> impl Iterator<Item = Provider> + '_ {
        self.adapters.keys().copied()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn market(&self) -> Market {
        self.market
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn get_by_native_id(
        &self,
        provider: Provider,
        kind: EntityKind,
        id: &str,
        market: Market,
    ) -> Option<ProviderResult> {
        let adapter = self.adapter(provider)?;
        self.call(provider, market, adapter.get_by_native_id(kind, id, market)).await
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn get_by_identifier(
        &self,
        provider: Provider,
        identifier: &Identifier,
        market: Market,
    ) -> Option<ProviderResult> {
        let adapter = self.adapter(provider)?;
        self.call(provider, market, adapter.get_by_identifier(identifier, market)).await
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn search_by_title_artist(
        &self,
        provider: Provider,
        title: &str,
        artist: &str,
        market: Market,
    ) -> Option<ProviderResult> {
        let adapter = self.adapter(provider)?;
        self.call(provider, market, adapter.search_by_title_artist(title, artist, market)).await
    }

    fn adapter(&self, provider: Provider) -> Option<&AdapterHandle> {
        let adapter = self.adapters.get(&provider);
        if adapter.is_none() {
            debug!(%provider, "no adapter registered");
        }
        adapter
    }

    async fn call(
        &self,
        provider: Provider,
        market: Market,
        future: impl Future<Output = AdapterResult<Option<ProviderResult>>>,
    ) -> Option<ProviderResult> {
        match tokio::time::timeout(self.timeout, future).await {
            Ok(Ok(Some(mut result))) => {
                result.provider = provider;
                result.is_primary = false;
                result.market.get_or_insert(market);
                Some(result)
            },
            Ok(Ok(None)) => {
                debug!(%provider, "not found");
                None
            },
            Ok(Err(err)) if *err == AdapterErrorKind::NotFound => {
                debug!(%provider, "not found");
                None
            },
            Ok(Err(err)) => {
                warn!(%provider, error = %*err, retryable = err.is_retryable(), "provider call failed");
                None
            },
            Err(_) => {
                warn!(%provider, timeout_ms = self.timeout.as_millis() as u64, "provider call timed out");
                None
            },
        }
    }
}
