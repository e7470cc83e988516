//! Scripted provider adapters.
//!
//! Only compiled for this crate's tests, or with the `testing` feature for
//! integration tests and downstream crates.

use crate::gateway::{AdapterErrorKind, AdapterResult, ProviderAdapter};
use async_trait::async_trait;
use crosstune_music::{EntityKind, Identifier, Market, Provider, ProviderResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// How a [`ScriptedAdapter`] answers once its delay has elapsed.
#[derive(Debug, Clone)]
pub enum Behaviour {
    /// Answer from the adapter's tables.
    Answer,
    Fail(AdapterErrorKind),
    /// Never answer.
    Hang,
}

/// An adapter that answers from fixed tables and counts every call, per
/// method.
pub struct ScriptedAdapter {
    provider: Provider,
    native: HashMap<String, ProviderResult>,
    identified: HashMap<Identifier, ProviderResult>,
    searches: HashMap<(String, String), ProviderResult>,
    behaviour: Behaviour,
    delay: Duration,
    native_calls: AtomicUsize,
    identifier_calls: AtomicUsize,
    search_calls: AtomicUsize,
}
impl ScriptedAdapter {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            native: HashMap::new(),
            identified: HashMap::new(),
            searches: HashMap::new(),
            behaviour: Behaviour::Answer,
            delay: Duration::ZERO,
            native_calls: AtomicUsize::new(0),
            identifier_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
        }
    }

    /// Known by its native id and, if it carries one, by its identifier.
    pub fn with(mut self, id: &str, result: ProviderResult) -> Self {
        if let Some(identifier) = result.identifier.clone() {
            self.identified.insert(identifier, result.clone());
        }
        self.with_native(id, result)
    }

    pub fn with_native(mut self, id: &str, result: ProviderResult) -> Self {
        self.native.insert(id.to_string(), result);
        self
    }

    /// Answer identifier lookups for `identifier`. A value that isn't an
    /// ISRC or UPC is never looked up, so it is ignored.
    pub fn with_identified(mut self, identifier: &str, result: ProviderResult) -> Self {
        if let Ok(identifier) = Identifier::detect(identifier) {
            self.identified.insert(identifier, result);
        }
        self
    }

    /// Answer searches for `title` by `artist`, case-insensitively.
    pub fn with_search(mut self, title: &str, artist: &str, result: ProviderResult) -> Self {
        self.searches.insert((title.to_lowercase(), artist.to_lowercase()), result);
        self
    }

    pub fn with_behaviour(mut self, behaviour: Behaviour) -> Self {
        self.behaviour = behaviour;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn native_calls(&self) -> usize {
        self.native_calls.load(Ordering::SeqCst)
    }

    pub fn identifier_calls(&self) -> usize {
        self.identifier_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    /// Calls of any kind.
    pub fn calls(&self) -> usize {
        self.native_calls() + self.identifier_calls() + self.search_calls()
    }

    async fn answer(&self, counter: &AtomicUsize, found: Option<&ProviderResult>) -> AdapterResult<Option<ProviderResult>> {
        counter.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.behaviour {
            Behaviour::Answer => Ok(found.cloned()),
            Behaviour::Fail(kind) => exn::bail!(kind.clone()),
            Behaviour::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn get_by_native_id(&self, _: EntityKind, id: &str, _: Market) -> AdapterResult<Option<ProviderResult>> {
        self.answer(&self.native_calls, self.native.get(id)).await
    }

    async fn get_by_identifier(&self, identifier: &Identifier, _: Market) -> AdapterResult<Option<ProviderResult>> {
        self.answer(&self.identifier_calls, self.identified.get(identifier)).await
    }

    async fn search_by_title_artist(
        &self,
        title: &str,
        artist: &str,
        _: Market,
    ) -> AdapterResult<Option<ProviderResult>> {
        self.answer(&self.search_calls, self.searches.get(&(title.to_lowercase(), artist.to_lowercase())))
            .await
    }
}
