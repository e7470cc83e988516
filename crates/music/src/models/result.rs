use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::hash::{Hash, Hasher};

use time::UtcDateTime;

use super::{DurableRecord, Identifier, Market, Provider};

/// One provider's metadata for a track or album.
///
/// Equality and hashing cover the identifier, artist, title, both URLs, the
/// market and the album discriminator. `provider` and `is_primary` are
/// deliberately left out: the flag is per-request aggregation state, and
/// two providers never share a canonical URL anyway.
#[derive(Debug, Clone)]
pub struct ProviderResult {
    pub provider: Provider,
    pub artist: String,
    pub title: String,
    /// ISRC for tracks, UPC for albums. Malformed values are never stored.
    pub identifier: Option<Identifier>,
    /// Canonical URL of the entity on the provider.
    pub url: String,
    pub art_url: Option<String>,
    /// `None` until the provider names a storefront. Reads as `us` through
    /// [`market`](Self::market).
    pub market: Option<Market>,
    /// `None` when the provider doesn't say whether this is an album.
    pub is_album: Option<bool>,
    /// Marks the provider the user's input referenced. Never persisted.
    pub is_primary: bool,
}
impl ProviderResult {
    pub fn new(provider: Provider, artist: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            provider,
            artist: artist.into(),
            title: title.into(),
            identifier: None,
            url: url.into(),
            art_url: None,
            market: None,
            is_album: None,
            is_primary: false,
        }
    }

    /// Attach an identifier reported by the provider. Anything that isn't a
    /// canonical ISRC/UPC is dropped.
    pub fn with_identifier(mut self, raw: impl AsRef<str>) -> Self {
        self.identifier = Identifier::parse_lenient(raw.as_ref());
        self
    }

    pub fn with_art_url(mut self, art_url: impl Into<String>) -> Self {
        let art_url = art_url.into();
        self.art_url = (!art_url.is_empty()).then_some(art_url);
        self
    }

    pub fn with_market(mut self, market: Market) -> Self {
        self.market = Some(market);
        self
    }

    /// The market this result was looked up in, defaulting to `us`.
    pub fn market(&self) -> Market {
        self.market.unwrap_or_default()
    }

    pub fn with_album(mut self, is_album: bool) -> Self {
        self.is_album = Some(is_album);
        self
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    /// Fallback identity for results without a usable identifier.
    pub fn name_identity(&self) -> WorkIdentity {
        WorkIdentity::Named {
            artist: collapse(&self.artist),
            title: collapse(&self.title),
        }
    }
}
impl PartialEq for ProviderResult {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
            && self.artist == other.artist
            && self.title == other.title
            && self.url == other.url
            && self.art_url == other.art_url
            && self.market() == other.market()
            && self.is_album == other.is_album
    }
}
impl Eq for ProviderResult {}
impl Hash for ProviderResult {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identifier.hash(state);
        self.artist.hash(state);
        self.title.hash(state);
        self.url.hash(state);
        self.art_url.hash(state);
        self.market().hash(state);
        self.is_album.hash(state);
    }
}

/// Lowercase and collapse runs of whitespace, for case-insensitive exact
/// matching of names.
pub(crate) fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// What makes two results "the same work".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WorkIdentity {
    Identifier(Identifier),
    /// Lowercased, whitespace-collapsed artist and title.
    Named { artist: String, title: String },
}
impl WorkIdentity {
    /// Stable string form, suitable for hashing into durable-store pointers.
    pub fn key(&self) -> String {
        match self {
            WorkIdentity::Identifier(identifier) => format!("{}:{}", identifier.kind(), identifier.value()),
            WorkIdentity::Named { artist, title } => format!("name:{artist}|{title}"),
        }
    }
}
impl Display for WorkIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.key())
    }
}

/// Pick the identity of a set of results: the primary's identifier, then
/// any identifier in provider order, then the primary's (or first) name.
pub(crate) fn identity_of<'a>(results: impl Iterator<Item = &'a ProviderResult> + Clone) -> Option<WorkIdentity> {
    let primary = results.clone().find(|r| r.is_primary);
    if let Some(identifier) = primary.and_then(|p| p.identifier.clone()) {
        return Some(WorkIdentity::Identifier(identifier));
    }
    if let Some(identifier) = results.clone().find_map(|r| r.identifier.clone()) {
        return Some(WorkIdentity::Identifier(identifier));
    }
    primary.or_else(|| results.clone().next()).map(ProviderResult::name_identity)
}

/// The unit of work: the cross-platform set of results for one input, plus
/// every input link that produced it.
///
/// Holds at most one entry per provider. Equality ignores the input links.
#[derive(Debug, Clone, Default)]
pub struct ResolutionResult {
    results: BTreeMap<Provider, ProviderResult>,
    links: BTreeSet<String>,
}
impl ResolutionResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a provider's result, returning whatever it replaced for the
    /// same provider.
    pub fn insert(&mut self, result: ProviderResult) -> Option<ProviderResult> {
        self.results.insert(result.provider, result)
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.add_link(link);
        self
    }

    pub fn add_link(&mut self, link: impl Into<String>) {
        self.links.insert(link.into());
    }

    pub fn extend_links(&mut self, links: impl IntoIterator<Item = String>) {
        self.links.extend(links);
    }

    pub fn links(&self) -> &BTreeSet<String> {
        &self.links
    }

    pub fn get(&self, provider: Provider) -> Option<&ProviderResult> {
        self.results.get(&provider)
    }

    pub fn primary(&self) -> Option<&ProviderResult> {
        self.results.values().find(|r| r.is_primary)
    }

    /// Flag `provider`'s entry as primary (and every other entry as not).
    /// Returns `false` if there is no entry for the provider.
    pub fn mark_primary(&mut self, provider: Provider) -> bool {
        let found = self.results.contains_key(&provider);
        for (p, result) in self.results.iter_mut() {
            result.is_primary = found && *p == provider;
        }
        found
    }

    pub fn providers(&self) -> impl Iterator<Item = Provider> + '_ {
        self.results.keys().copied()
    }

    pub fn results(&self) -> impl Iterator<Item = &ProviderResult> + Clone {
        self.results.values()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn identity(&self) -> Option<WorkIdentity> {
        identity_of(self.results())
    }

    /// Whether two results describe the same work.
    pub fn same_work(&self, other: &Self) -> bool {
        matches!((self.identity(), other.identity()), (Some(a), Some(b)) if a == b)
    }

    /// Strip the request-local state (links, primary flag) and produce the
    /// provider-agnostic record for durable storage.
    ///
    /// The primary result is written first, so the record's identity is the
    /// one [`identity`](Self::identity) reports.
    pub fn to_record(&self, looked_up_at: UtcDateTime) -> DurableRecord {
        let (primary, rest): (Vec<_>, Vec<_>) = self.results.values().partition(|r| r.is_primary);
        DurableRecord::new(
            looked_up_at,
            primary
                .into_iter()
                .chain(rest)
                .cloned()
                .map(|mut r| {
                    r.is_primary = false;
                    r
                })
                .collect(),
        )
    }

    /// Rebuild a result from a durable record. Nothing is primary; duplicate
    /// providers in a (hand-edited) record keep the first entry.
    pub fn from_record(record: &DurableRecord) -> Self {
        let mut resolution = Self::new();
        for result in &record.results {
            if resolution.get(result.provider).is_none() {
                let mut result = result.clone();
                result.is_primary = false;
                resolution.insert(result);
            }
        }
        resolution
    }
}
impl PartialEq for ResolutionResult {
    fn eq(&self, other: &Self) -> bool {
        self.results == other.results
    }
}
impl Eq for ResolutionResult {}
impl FromIterator<ProviderResult> for ResolutionResult {
    fn from_iter<T: IntoIterator<Item = ProviderResult>>(iter: T) -> Self {
        let mut resolution = Self::new();
        for result in iter {
            resolution.insert(result);
        }
        resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spotify() -> ProviderResult {
        ProviderResult::new(Provider::Spotify, "Rick Astley", "Never Gonna Give You Up", "https://open.spotify.com/track/abc123")
            .with_identifier("USRC17607839")
    }

    fn apple() -> ProviderResult {
        ProviderResult::new(Provider::AppleMusic, "Rick Astley", "Never Gonna Give You Up", "https://music.apple.com/us/song/1")
            .with_identifier("usrc17607839")
    }

    #[test]
    fn test_equality_ignores_primary_flag() {
        assert_eq!(spotify(), spotify().primary());
    }

    #[test]
    fn test_equality_covers_market() {
        let gb = spotify().with_market("gb".parse().unwrap());
        assert_ne!(spotify(), gb);
    }

    #[test]
    fn test_unset_market_reads_as_default() {
        assert_eq!(spotify().market, None);
        assert_eq!(spotify().market(), Market::US);
        assert_eq!(spotify(), spotify().with_market(Market::US));
    }

    #[test]
    fn test_malformed_identifier_is_absent() {
        let result = spotify().with_identifier("USRC-not-valid");
        assert_eq!(result.identifier, None);
    }

    #[test]
    fn test_one_entry_per_provider() {
        let mut resolution = ResolutionResult::new();
        assert!(resolution.insert(spotify()).is_none());
        let replaced = resolution.insert(spotify().with_art_url("https://i.scdn.co/image/1"));
        assert!(replaced.is_some());
        assert_eq!(resolution.len(), 1);
    }

    #[test]
    fn test_mark_primary_is_exclusive() {
        let mut resolution: ResolutionResult = [spotify().primary(), apple()].into_iter().collect();
        assert!(resolution.mark_primary(Provider::AppleMusic));
        assert_eq!(resolution.primary().map(|r| r.provider), Some(Provider::AppleMusic));
        assert!(!resolution.get(Provider::Spotify).unwrap().is_primary);
        assert!(!resolution.mark_primary(Provider::Tidal));
        assert!(resolution.primary().is_none());
    }

    #[test]
    fn test_identity_prefers_primary_identifier() {
        let resolution: ResolutionResult = [spotify().primary(), apple()].into_iter().collect();
        assert_eq!(
            resolution.identity(),
            Some(WorkIdentity::Identifier(Identifier::Isrc("USRC17607839".to_string())))
        );
    }

    #[test]
    fn test_identity_falls_back_to_collapsed_names() {
        let a = ProviderResult::new(Provider::SoundCloud, "  Rick   ASTLEY ", "Never gonna give you up", "https://soundcloud.com/a/b");
        let b = ProviderResult::new(Provider::Tidal, "rick astley", "NEVER  GONNA GIVE YOU UP", "https://tidal.com/track/1");
        let left: ResolutionResult = [a.primary()].into_iter().collect();
        let right: ResolutionResult = [b.primary()].into_iter().collect();
        assert!(left.same_work(&right));
    }

    #[test]
    fn test_different_identifiers_are_different_works() {
        let left: ResolutionResult = [spotify().primary()].into_iter().collect();
        let other = spotify().with_identifier("GBAYE0601498");
        let right: ResolutionResult = [other.primary()].into_iter().collect();
        assert!(!left.same_work(&right));
    }

    #[test]
    fn test_record_identity_matches_result_identity() {
        let deezer = ProviderResult::new(Provider::Deezer, "Rick Astley", "Never Gonna Give You Up", "https://www.deezer.com/track/1")
            .with_identifier("GBAYE0601498");
        let resolution: ResolutionResult = [apple(), deezer.primary()].into_iter().collect();
        let record = resolution.to_record(UtcDateTime::now());
        assert_eq!(record.results[0].provider, Provider::Deezer);
        assert_eq!(record.identity(), resolution.identity());
        assert_eq!(
            record.identity(),
            Some(WorkIdentity::Identifier(Identifier::Isrc("GBAYE0601498".to_string())))
        );
    }

    #[test]
    fn test_record_drops_links_and_primary() {
        let resolution = [spotify().primary(), apple()]
            .into_iter()
            .collect::<ResolutionResult>()
            .with_link("https://open.spotify.com/track/abc123");
        let record = resolution.to_record(UtcDateTime::now());
        assert_eq!(record.results.len(), 2);
        assert!(record.results.iter().all(|r| !r.is_primary));
        let rebuilt = ResolutionResult::from_record(&record);
        assert!(rebuilt.links().is_empty());
        assert_eq!(rebuilt, resolution);
    }
}
