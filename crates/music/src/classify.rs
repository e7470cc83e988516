//! Link classification: turning free-form text into resolvable inputs.

use std::fmt::{Display, Formatter, Result as FmtResult};

use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, instrument};

use crate::consts::*;
use crate::models::{EntityKind, Identifier, Market, Provider};
use crate::normalize::{identifier_key, normalize, query_param_key, search_key};

/// Characters commonly wrapped around links in chat messages.
const WRAPPING_PUNCTUATION: &[char] = &['<', '>', '(', ')', '[', ']', '"', '\'', ',', '.', ';', '!'];

/// One provider URL grammar.
struct Grammar {
    provider: Provider,
    regex: &'static LazyLock<Regex>,
    /// `None` means the grammar captures a `kind` group.
    kind: Option<EntityKind>,
    /// Query parameter holding the identifying segment, if any.
    key_param: Option<&'static str>,
}

// Order matters: the first matching grammar wins.
static GRAMMARS: [Grammar; 12] = [
    Grammar { provider: Provider::Spotify, regex: &SPOTIFY_REGEX, kind: None, key_param: None },
    Grammar {
        provider: Provider::AppleMusic,
        regex: &APPLE_MUSIC_SONG_IN_ALBUM_REGEX,
        kind: Some(EntityKind::Track),
        key_param: Some("i"),
    },
    Grammar { provider: Provider::AppleMusic, regex: &APPLE_MUSIC_REGEX, kind: None, key_param: None },
    Grammar {
        provider: Provider::YoutubeMusic,
        regex: &YOUTUBE_MUSIC_WATCH_REGEX,
        kind: Some(EntityKind::Track),
        key_param: Some("v"),
    },
    Grammar {
        provider: Provider::YoutubeMusic,
        regex: &YOUTUBE_WATCH_REGEX,
        kind: Some(EntityKind::Video),
        key_param: Some("v"),
    },
    Grammar { provider: Provider::YoutubeMusic, regex: &YOUTU_BE_REGEX, kind: Some(EntityKind::Video), key_param: None },
    Grammar {
        provider: Provider::YoutubeMusic,
        regex: &YOUTUBE_PLAYLIST_REGEX,
        kind: Some(EntityKind::Playlist),
        key_param: Some("list"),
    },
    Grammar {
        provider: Provider::YoutubeMusic,
        regex: &YOUTUBE_MUSIC_BROWSE_REGEX,
        kind: Some(EntityKind::Album),
        key_param: None,
    },
    Grammar {
        provider: Provider::SoundCloud,
        regex: &SOUNDCLOUD_SET_REGEX,
        kind: Some(EntityKind::Playlist),
        key_param: None,
    },
    Grammar {
        provider: Provider::SoundCloud,
        regex: &SOUNDCLOUD_TRACK_REGEX,
        kind: Some(EntityKind::Track),
        key_param: None,
    },
    Grammar { provider: Provider::Tidal, regex: &TIDAL_REGEX, kind: None, key_param: None },
    Grammar { provider: Provider::Deezer, regex: &DEEZER_REGEX, kind: None, key_param: None },
];

/// What a classified input asks us to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// A provider link.
    Link {
        provider: Provider,
        kind: EntityKind,
        /// Provider-native identifier, as it appeared in the link.
        id: String,
        /// Storefront implied by the link itself, if any.
        market: Option<Market>,
    },
    /// A bare ISRC or UPC; skips link grammars entirely.
    Identifier(Identifier),
    /// A title/artist search. Never produced by the classifier itself.
    Search { artist: String, title: String },
}

/// A single resolvable input extracted from user text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Classified {
    /// The input exactly as the user supplied it (minus wrapping punctuation).
    pub raw: String,
    /// Normalized cache key.
    pub key: String,
    pub target: Target,
}
impl Classified {
    /// Input for a bare identifier, keyed like a classified one.
    pub fn identifier(identifier: Identifier) -> Self {
        Self {
            raw: identifier.to_string(),
            key: identifier_key(&identifier),
            target: Target::Identifier(identifier),
        }
    }

    /// Input for a title/artist search.
    pub fn search(artist: impl Into<String>, title: impl Into<String>) -> Self {
        let (artist, title) = (artist.into(), title.into());
        Self {
            raw: format!("{artist} - {title}"),
            key: search_key(&artist, &title),
            target: Target::Search { artist, title },
        }
    }

    /// The provider the user linked to, if any. Its entry is the primary one.
    pub fn provider(&self) -> Option<Provider> {
        match &self.target {
            Target::Link { provider, .. } => Some(*provider),
            Target::Identifier(_) | Target::Search { .. } => None,
        }
    }

    /// Whether this input can produce a cross-provider result at all.
    pub fn is_resolvable(&self) -> bool {
        match &self.target {
            Target::Link { kind, .. } => kind.is_resolvable(),
            Target::Identifier(_) | Target::Search { .. } => true,
        }
    }
}
impl Display for Classified {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.target {
            Target::Link { provider, kind, id, market } => {
                write!(f, "{provider} {kind} {id}")?;
                if let Some(market) = market {
                    write!(f, " ({market})")?;
                }
            },
            Target::Identifier(identifier) => write!(f, "{} {}", identifier.kind(), identifier)?,
            Target::Search { artist, title } => write!(f, "search \"{artist}\" \"{title}\"")?,
        }
        write!(f, " [{}]", self.key)
    }
}

/// Extract every recognizable input from free-form text, in order.
///
/// Tokens matching no grammar (and no identifier shape) are dropped.
#[instrument(level = "debug", skip(text), fields(text_len = text.len()))]
pub fn classify(text: &str) -> Vec<Classified> {
    text.split_whitespace().filter_map(classify_token).collect()
}

/// Classify a single token, such as one link.
pub fn classify_token(token: &str) -> Option<Classified> {
    let token = token.trim_matches(WRAPPING_PUNCTUATION);
    if token.is_empty() {
        return None;
    }
    if !token.contains(['/', ':']) {
        return classify_identifier(token);
    }
    let classified = GRAMMARS.iter().find_map(|grammar| grammar.classify(token));
    if classified.is_none() {
        debug!(token, "no grammar matched");
    }
    classified
}

fn classify_identifier(token: &str) -> Option<Classified> {
    let compact_len = token.chars().filter(|c| *c != '-').count();
    if !(12..=14).contains(&compact_len) {
        return None;
    }
    let identifier = Identifier::detect(token).ok()?;
    Some(Classified { raw: token.to_string(), ..Classified::identifier(identifier) })
}

impl Grammar {
    fn classify(&self, token: &str) -> Option<Classified> {
        let captures = self.regex.captures(token)?;
        let id = captures.name("id")?.as_str().to_string();
        let kind = match self.kind {
            Some(kind) => kind,
            None => captures.name("kind")?.as_str().parse().ok()?,
        };
        if !self.provider.supports(kind) {
            return None;
        }
        let market = captures.name("market").and_then(|m| m.as_str().parse::<Market>().ok());
        let key = match self.key_param {
            Some(param) => query_param_key(token, param, &id),
            None => normalize(token),
        };
        Some(Classified {
            raw: token.to_string(),
            key,
            target: Target::Link { provider: self.provider, kind, id, market },
        })
    }
}
