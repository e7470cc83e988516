//! Fan-out from one seed (or one identifier, or one search) to every other
//! configured provider.

use crate::gateway::ProviderGateway;
use crosstune_music::{EntityKind, Identifier, IdentifierKind, Market, Provider, ProviderResult, ResolutionResult, Target};
use futures::future::join_all;
use tracing::{debug, instrument};

/// Resolve a classified target against the gateway.
///
/// Returns `None` when the target can't be resolved at all: an unresolvable
/// entity kind, a seed the linked provider doesn't know, or an identifier or
/// search that no provider matched.
pub async fn resolve_target(gateway: &ProviderGateway, target: &Target) -> Option<ResolutionResult> {
    match target {
        Target::Link { provider, kind, id, market } => {
            if !kind.is_resolvable() {
                debug!(%provider, %kind, "entity kind has no cross-provider identifier");
                return None;
            }
            let market = market.unwrap_or(gateway.market());
            let seed = gateway.get_by_native_id(*provider, *kind, id, market).await?;
            Some(cross_reference(gateway, seed, market).await)
        },
        Target::Identifier(identifier) => by_identifier(gateway, identifier, gateway.market()).await,
        Target::Search { artist, title } => by_search(gateway, title, artist, gateway.market()).await,
    }
}

/// Query every provider other than the seed's, by the seed's identifier if
/// it has one and by title/artist otherwise.
///
/// The seed's entry is always present and marked primary. Providers that
/// fail, time out or find nothing are simply missing from the result.
#[instrument(level = "debug", skip_all, fields(seed = %seed.provider))]
pub async fn cross_reference(gateway: &ProviderGateway, seed: ProviderResult, market: Market) -> ResolutionResult {
    let kind = entity_kind_of(&seed);
    let others: Vec<Provider> = gateway.providers().filter(|p| *p != seed.provider && p.supports(kind)).collect();
    let found = join_all(others.into_iter().map(|provider| {
        let seed = &seed;
        async move {
            match &seed.identifier {
                Some(identifier) => gateway.get_by_identifier(provider, identifier, market).await,
                None => gateway.search_by_title_artist(provider, &seed.title, &seed.artist, market).await,
            }
        }
    }))
    .await;

    let mut resolution = ResolutionResult::new();
    for result in found.into_iter().flatten() {
        if let (Some(expected), Some(actual)) = (&seed.identifier, &result.identifier)
            && expected != actual
        {
            debug!(provider = %result.provider, %expected, %actual, "provider reported a different identifier");
        }
        resolution.insert(result);
    }
    resolution.insert(seed.primary());
    resolution
}

/// Query every provider that carries this kind of identifier. Nothing is
/// primary.
#[instrument(level = "debug", skip(gateway))]
pub async fn by_identifier(
    gateway: &ProviderGateway,
    identifier: &Identifier,
    market: Market,
) -> Option<ResolutionResult> {
    let kind = match identifier.kind() {
        IdentifierKind::Isrc => EntityKind::Track,
        IdentifierKind::Upc => EntityKind::Album,
    };
    let providers: Vec<Provider> = gateway.providers().filter(|p| p.supports(kind)).collect();
    let found = join_all(providers.into_iter().map(|p| gateway.get_by_identifier(p, identifier, market))).await;
    non_empty(found.into_iter().flatten().collect())
}

/// Search every provider for a title/artist pair. Nothing is primary.
#[instrument(level = "debug", skip(gateway))]
pub async fn by_search(gateway: &ProviderGateway, title: &str, artist: &str, market: Market) -> Option<ResolutionResult> {
    let providers: Vec<Provider> = gateway.providers().collect();
    let found =
        join_all(providers.into_iter().map(|p| gateway.search_by_title_artist(p, title, artist, market))).await;
    non_empty(found.into_iter().flatten().collect())
}

fn non_empty(resolution: ResolutionResult) -> Option<ResolutionResult> {
    match resolution.is_empty() {
        true => {
            debug!("no provider matched");
            None
        },
        false => Some(resolution),
    }
}

/// Whether the seed is a track or an album, for deciding which providers can
/// possibly carry it.
fn entity_kind_of(seed: &ProviderResult) -> EntityKind {
    match (&seed.identifier, seed.is_album) {
        (Some(Identifier::Upc(_)), _) | (None, Some(true)) => EntityKind::Album,
        _ => EntityKind::Track,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::AdapterErrorKind;
    use crate::testing::{Behaviour, ScriptedAdapter};
    use std::sync::Arc;
    use std::time::Duration;

    const ISRC: &str = "USRC17607839";

    fn track(provider: Provider, url: &str) -> ProviderResult {
        ProviderResult::new(provider, "Rick Astley", "Never Gonna Give You Up", url)
    }

    fn spotify() -> ScriptedAdapter {
        ScriptedAdapter::new(Provider::Spotify)
            .with_native("abc123", track(Provider::Spotify, "https://open.spotify.com/track/abc123").with_identifier(ISRC))
    }

    fn apple() -> ScriptedAdapter {
        ScriptedAdapter::new(Provider::AppleMusic)
            .with_identified(ISRC, track(Provider::AppleMusic, "https://music.apple.com/us/song/1").with_identifier(ISRC))
    }

    fn link(provider: Provider, kind: EntityKind, id: &str) -> Target {
        Target::Link { provider, kind, id: id.to_string(), market: None }
    }

    #[tokio::test]
    async fn test_seed_is_primary_and_others_secondary() {
        let gateway = ProviderGateway::new().with_adapter(Arc::new(spotify())).with_adapter(Arc::new(apple()));
        let result = resolve_target(&gateway, &link(Provider::Spotify, EntityKind::Track, "abc123")).await.unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.primary().map(|r| r.provider), Some(Provider::Spotify));
        assert!(!result.get(Provider::AppleMusic).unwrap().is_primary);
    }

    #[tokio::test]
    async fn test_seed_provider_is_not_queried_again() {
        let spotify = Arc::new(spotify());
        let gateway = ProviderGateway::new().with_adapter(spotify.clone()).with_adapter(Arc::new(apple()));
        resolve_target(&gateway, &link(Provider::Spotify, EntityKind::Track, "abc123")).await.unwrap();
        assert_eq!(spotify.calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_seed_is_no_result() {
        let apple = Arc::new(apple());
        let gateway = ProviderGateway::new().with_adapter(Arc::new(spotify())).with_adapter(apple.clone());
        assert!(resolve_target(&gateway, &link(Provider::Spotify, EntityKind::Track, "nope")).await.is_none());
        assert_eq!(apple.calls(), 0);
    }

    #[tokio::test]
    async fn test_playlists_are_never_resolved() {
        let spotify = Arc::new(spotify());
        let gateway = ProviderGateway::new().with_adapter(spotify.clone());
        assert!(resolve_target(&gateway, &link(Provider::Spotify, EntityKind::Playlist, "abc123")).await.is_none());
        assert_eq!(spotify.calls(), 0);
    }

    #[tokio::test]
    async fn test_failing_provider_is_omitted() {
        let tidal = ScriptedAdapter::new(Provider::Tidal).with_behaviour(Behaviour::Hang);
        let deezer = ScriptedAdapter::new(Provider::Deezer).with_behaviour(Behaviour::Fail(AdapterErrorKind::RateLimited));
        let gateway = ProviderGateway::new()
            .with_timeout(Duration::from_millis(50))
            .with_adapter(Arc::new(spotify()))
            .with_adapter(Arc::new(apple()))
            .with_adapter(Arc::new(tidal))
            .with_adapter(Arc::new(deezer));
        let result = resolve_target(&gateway, &link(Provider::Spotify, EntityKind::Track, "abc123")).await.unwrap();
        assert_eq!(result.providers().collect::<Vec<_>>(), vec![Provider::Spotify, Provider::AppleMusic]);
    }

    #[tokio::test]
    async fn test_seed_without_identifier_searches() {
        let seed = track(Provider::SoundCloud, "https://soundcloud.com/rick/never");
        let soundcloud = ScriptedAdapter::new(Provider::SoundCloud).with_native("rick/never", seed);
        let tidal = Arc::new(ScriptedAdapter::new(Provider::Tidal).with_search(
            "never gonna give you up",
            "rick astley",
            track(Provider::Tidal, "https://tidal.com/track/1"),
        ));
        let gateway = ProviderGateway::new().with_adapter(Arc::new(soundcloud)).with_adapter(tidal.clone());
        let result = resolve_target(&gateway, &link(Provider::SoundCloud, EntityKind::Track, "rick/never")).await.unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(tidal.calls(), 1);
    }

    #[tokio::test]
    async fn test_seed_alone_when_nothing_matches() {
        let seed = track(Provider::SoundCloud, "https://soundcloud.com/rick/never");
        let soundcloud = ScriptedAdapter::new(Provider::SoundCloud).with_native("rick/never", seed);
        let gateway = ProviderGateway::new()
            .with_adapter(Arc::new(soundcloud))
            .with_adapter(Arc::new(ScriptedAdapter::new(Provider::Tidal)));
        let result = resolve_target(&gateway, &link(Provider::SoundCloud, EntityKind::Track, "rick/never")).await.unwrap();
        assert_eq!(result.len(), 1);
        assert!(result.get(Provider::SoundCloud).unwrap().is_primary);
    }

    #[tokio::test]
    async fn test_album_seed_skips_providers_without_albums() {
        const UPC: &str = "00602537518357";
        let album = ProviderResult::new(Provider::Deezer, "Nirvana", "Nevermind", "https://www.deezer.com/album/1")
            .with_identifier(UPC)
            .with_album(true);
        let deezer = ScriptedAdapter::new(Provider::Deezer).with_native("1", album);
        let soundcloud = Arc::new(ScriptedAdapter::new(Provider::SoundCloud));
        let gateway = ProviderGateway::new().with_adapter(Arc::new(deezer)).with_adapter(soundcloud.clone());
        resolve_target(&gateway, &link(Provider::Deezer, EntityKind::Album, "1")).await.unwrap();
        assert_eq!(soundcloud.calls(), 0);
    }

    #[tokio::test]
    async fn test_identifier_path_has_no_primary() {
        let gateway = ProviderGateway::new().with_adapter(Arc::new(apple()));
        let identifier = Identifier::isrc(ISRC).unwrap();
        let result = resolve_target(&gateway, &Target::Identifier(identifier)).await.unwrap();
        assert_eq!(result.len(), 1);
        assert!(result.primary().is_none());
    }

    #[tokio::test]
    async fn test_empty_identifier_fan_out_is_no_result() {
        let gateway = ProviderGateway::new().with_adapter(Arc::new(apple()));
        let identifier = Identifier::isrc("GBAYE0601498").unwrap();
        assert!(by_identifier(&gateway, &identifier, Market::US).await.is_none());
    }

    #[tokio::test]
    async fn test_search_path() {
        let tidal = ScriptedAdapter::new(Provider::Tidal).with_search(
            "Never Gonna Give You Up",
            "Rick Astley",
            track(Provider::Tidal, "https://tidal.com/track/1"),
        );
        let gateway = ProviderGateway::new().with_adapter(Arc::new(tidal));
        let target = Target::Search { artist: "rick astley".to_string(), title: "never gonna give you up".to_string() };
        let result = resolve_target(&gateway, &target).await.unwrap();
        assert!(result.get(Provider::Tidal).is_some());
        assert!(result.primary().is_none());
    }
}
