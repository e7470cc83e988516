#![allow(dead_code)]

use crosstune_cache::{Database, Repository};
use crosstune_music::{Provider, ProviderResult};
use crosstune_resolve::coordinator::DEFAULT_FRESHNESS;
use crosstune_resolve::testing::ScriptedAdapter;
use crosstune_resolve::{CacheCoordinator, ProviderGateway, Resolver};
use crosstune_storage::StoreHandle;
use crosstune_storage::backend::MockStore;
use std::sync::Arc;
use std::time::Duration;

pub const SPOTIFY_LINK: &str = "https://open.spotify.com/track/abc123";
pub const APPLE_LINK: &str = "https://music.apple.com/us/song/never-gonna-give-you-up/1558533900";
pub const ISRC: &str = "USRC17607839";
pub const UPC: &str = "00602537518357";

pub fn track(provider: Provider, url: &str) -> ProviderResult {
    ProviderResult::new(provider, "Rick Astley", "Never Gonna Give You Up", url).with_identifier(ISRC)
}

pub fn album(provider: Provider, url: &str) -> ProviderResult {
    ProviderResult::new(provider, "Nirvana", "Nevermind", url).with_identifier(UPC).with_album(true)
}

pub async fn resolver(adapters: &[Arc<ScriptedAdapter>], store: StoreHandle, timeout: Duration) -> Resolver {
    let gateway = adapters
        .iter()
        .fold(ProviderGateway::new().with_timeout(timeout), |g, a| g.with_adapter(a.clone()));
    let db = Database::connect_in_memory().await.unwrap();
    Resolver::new(CacheCoordinator::new(gateway, Repository::from(&db), store, DEFAULT_FRESHNESS))
}

pub fn mock_store() -> Arc<MockStore> {
    Arc::new(MockStore::default())
}
