use crate::aggregate::{Accepted, Aggregator};
use crate::coordinator::CacheCoordinator;
use async_stream::stream;
use crosstune_music::{Classified, ResolutionResult, WorkIdentity};
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};
use std::collections::HashMap;
use tracing::debug;

/// Default number of simultaneous resolutions per batch.
pub const DEFAULT_CONCURRENCY: usize = 16;

/// Events emitted by [`resolve_batch`], in completion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    /// A work not seen before in this batch. Emitted as soon as its own
    /// resolution completes.
    Resolved(ResolutionResult),
    /// An input that turned out to be a work already emitted. Its link
    /// belongs in that work's input links.
    Merged { link: String, identity: WorkIdentity },
}

/// Streams the resolution of every classified input.
///
/// Inputs sharing a normalized key are resolved once. At most `concurrency`
/// resolutions run at the same time, and queued inputs are promoted as
/// in-flight ones complete. Unresolvable inputs (playlists, artists) are
/// skipped. Dropping the stream cancels whatever is still in flight, except
/// where another request is waiting on the same key.
pub fn resolve_batch(
    coordinator: CacheCoordinator,
    inputs: Vec<Classified>,
    concurrency: usize,
) -> impl Stream<Item = BatchEvent> + Send + 'static {
    let mut groups: Vec<_> = group_by_key(inputs).into_iter().map(|group| resolve_group(coordinator.clone(), group)).collect();
    let concurrency = concurrency.max(1);
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        let mut aggregator = Aggregator::new();
        let mut resolving = FuturesUnordered::new();
        resolving.extend(groups.drain(..concurrency.min(groups.len())));
        while let Some(result) = resolving.next().await {
            // Pop-n-push, but FIFO instead of LIFO.
            if !groups.is_empty() {
                resolving.push(groups.remove(0));
            }
            let Some(result) = result else {
                continue;
            };
            let links = result.links().clone();
            match aggregator.accept(result.clone()) {
                Accepted::New => {
                    yield BatchEvent::Resolved(result);
                },
                Accepted::Duplicate(identity) => {
                    debug!(%identity, "duplicate work in batch");
                    for link in links {
                        yield BatchEvent::Merged { link, identity: identity.clone() };
                    }
                },
            }
        }
    })
}

/// Drain a batch stream into one result per distinct work, with every
/// contributing input link merged in.
pub async fn collect_batch(events: impl Stream<Item = BatchEvent>) -> Vec<ResolutionResult> {
    let mut aggregator = Aggregator::new();
    let mut events = std::pin::pin!(events);
    while let Some(event) = events.next().await {
        match event {
            BatchEvent::Resolved(result) => {
                aggregator.accept(result);
            },
            BatchEvent::Merged { link, identity } => {
                aggregator.merge_link(&identity, link);
            },
        }
    }
    aggregator.into_results()
}

/// Group inputs by normalized key, in first-seen order, dropping anything
/// that can't be resolved.
fn group_by_key(inputs: Vec<Classified>) -> Vec<Vec<Classified>> {
    let mut groups: Vec<Vec<Classified>> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for input in inputs {
        if !input.is_resolvable() {
            debug!(%input, "skipping unresolvable input");
            continue;
        }
        match positions.get(&input.key) {
            Some(&index) => groups[index].push(input),
            None => {
                positions.insert(input.key.clone(), groups.len());
                groups.push(vec![input]);
            },
        }
    }
    groups
}

async fn resolve_group(coordinator: CacheCoordinator, group: Vec<Classified>) -> Option<ResolutionResult> {
    let (first, rest) = group.split_first()?;
    let mut result = coordinator.lookup(first).await.result?;
    result.extend_links(rest.iter().map(|input| input.raw.clone()));
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::DEFAULT_FRESHNESS;
    use crate::gateway::ProviderGateway;
    use crate::testing::ScriptedAdapter;
    use crosstune_cache::{Database, Repository};
    use crosstune_music::{Provider, ProviderResult, classify};
    use crosstune_storage::backend::MockStore;
    use std::sync::Arc;
    use std::time::Duration;

    const ISRC: &str = "USRC17607839";

    fn track(provider: Provider, url: &str) -> ProviderResult {
        ProviderResult::new(provider, "Rick Astley", "Never Gonna Give You Up", url).with_identifier(ISRC)
    }

    async fn coordinator(adapters: Vec<ScriptedAdapter>) -> CacheCoordinator {
        let gateway = adapters.into_iter().fold(ProviderGateway::new(), |g, a| g.with_adapter(Arc::new(a)));
        let db = Database::connect_in_memory().await.unwrap();
        CacheCoordinator::new(gateway, Repository::from(&db), Arc::new(MockStore::default()), DEFAULT_FRESHNESS)
    }

    #[test]
    fn test_grouping_keeps_first_seen_order() {
        let inputs = classify(
            "https://open.spotify.com/playlist/p1 https://tidal.com/track/1 \
             https://open.spotify.com/track/abc123 http://www.tidal.com/track/1/",
        );
        let groups = group_by_key(inputs);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[1][0].provider(), Some(Provider::Spotify));
    }

    #[tokio::test]
    async fn test_same_work_from_two_providers_is_emitted_once() {
        let spotify = ScriptedAdapter::new(Provider::Spotify)
            .with_native("abc123", track(Provider::Spotify, "https://open.spotify.com/track/abc123"))
            .with_identified(ISRC, track(Provider::Spotify, "https://open.spotify.com/track/abc123"));
        let tidal = ScriptedAdapter::new(Provider::Tidal)
            .with_native("1", track(Provider::Tidal, "https://tidal.com/track/1"))
            .with_identified(ISRC, track(Provider::Tidal, "https://tidal.com/track/1"));
        let coordinator = coordinator(vec![spotify, tidal]).await;
        let inputs = classify("https://open.spotify.com/track/abc123 https://tidal.com/track/1");

        let events: Vec<_> = resolve_batch(coordinator.clone(), inputs.clone(), 4).collect().await;
        assert_eq!(events.iter().filter(|e| matches!(e, BatchEvent::Resolved(_))).count(), 1);
        assert_eq!(events.iter().filter(|e| matches!(e, BatchEvent::Merged { .. })).count(), 1);

        let results = collect_batch(resolve_batch(coordinator, inputs, 4)).await;
        assert_eq!(results.len(), 1);
        assert!(results[0].links().contains("https://open.spotify.com/track/abc123"));
        assert!(results[0].links().contains("https://tidal.com/track/1"));
    }

    #[tokio::test]
    async fn test_duplicate_keys_resolve_once() {
        let spotify = ScriptedAdapter::new(Provider::Spotify)
            .with_native("abc123", track(Provider::Spotify, "https://open.spotify.com/track/abc123"));
        let tidal = ScriptedAdapter::new(Provider::Tidal);
        let coordinator = coordinator(vec![spotify, tidal]).await;
        let inputs = classify("https://open.spotify.com/track/abc123 open.spotify.com/track/abc123?si=xyz");
        let results = collect_batch(resolve_batch(coordinator.clone(), inputs, 4)).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].links().len(), 2);
    }

    #[tokio::test]
    async fn test_emits_in_completion_order() {
        // SoundCloud carries no albums, so the album never waits on it.
        let soundcloud = ScriptedAdapter::new(Provider::SoundCloud)
            .with_native("a/slow", ProviderResult::new(Provider::SoundCloud, "A", "Slow", "https://soundcloud.com/a/slow"))
            .with_delay(Duration::from_millis(200));
        let tidal = ScriptedAdapter::new(Provider::Tidal).with_native(
            "1",
            ProviderResult::new(Provider::Tidal, "B", "Fast", "https://tidal.com/album/1").with_album(true),
        );
        let coordinator = coordinator(vec![soundcloud, tidal]).await;
        let inputs = classify("https://soundcloud.com/a/slow https://tidal.com/album/1");
        let events: Vec<_> = resolve_batch(coordinator, inputs, 4).collect().await;
        let titles: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                BatchEvent::Resolved(r) => r.primary().map(|p| p.title.clone()),
                BatchEvent::Merged { .. } => None,
            })
            .collect();
        assert_eq!(titles, vec!["Fast".to_string(), "Slow".to_string()]);
    }

    #[tokio::test]
    async fn test_unresolved_inputs_are_dropped() {
        let coordinator = coordinator(vec![ScriptedAdapter::new(Provider::Spotify), ScriptedAdapter::new(Provider::Tidal)]).await;
        let inputs = classify("https://open.spotify.com/track/missing https://open.spotify.com/artist/x");
        let events: Vec<_> = resolve_batch(coordinator, inputs, 1).collect().await;
        assert!(events.is_empty());
    }
}
