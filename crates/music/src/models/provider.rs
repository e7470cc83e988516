use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use super::sanitize;
use crate::error::{Error, ErrorKind};
use crate::models::IdentifierKind;

/// A streaming provider we know how to classify links for.
///
/// Ordering is stable and used wherever "first provider" matters (work
/// identity fallbacks, record serialization order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Provider {
    Spotify,
    AppleMusic,
    YoutubeMusic,
    SoundCloud,
    Tidal,
    Deezer,
}
impl Provider {
    pub const ALL: [Provider; 6] = [
        Provider::Spotify,
        Provider::AppleMusic,
        Provider::YoutubeMusic,
        Provider::SoundCloud,
        Provider::Tidal,
        Provider::Deezer,
    ];

    /// Returns the machine tag for the provider (used in config, storage and
    /// cache keys).
    pub fn as_tag(&self) -> &'static str {
        match self {
            Provider::Spotify => "spotify",
            Provider::AppleMusic => "apple-music",
            Provider::YoutubeMusic => "youtube-music",
            Provider::SoundCloud => "soundcloud",
            Provider::Tidal => "tidal",
            Provider::Deezer => "deezer",
        }
    }

    /// Returns the human-readable provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Spotify => "Spotify",
            Provider::AppleMusic => "Apple Music",
            Provider::YoutubeMusic => "YouTube Music",
            Provider::SoundCloud => "SoundCloud",
            Provider::Tidal => "Tidal",
            Provider::Deezer => "Deezer",
        }
    }

    /// Entity kinds this provider's links can point at.
    pub fn supported_kinds(&self) -> &'static [EntityKind] {
        match self {
            Provider::Spotify | Provider::Deezer => {
                &[EntityKind::Track, EntityKind::Album, EntityKind::Playlist, EntityKind::Artist]
            },
            Provider::AppleMusic => &[EntityKind::Track, EntityKind::Album, EntityKind::Playlist, EntityKind::Artist],
            Provider::YoutubeMusic => &[EntityKind::Track, EntityKind::Album, EntityKind::Playlist, EntityKind::Video],
            Provider::SoundCloud => &[EntityKind::Track, EntityKind::Playlist],
            Provider::Tidal => &[
                EntityKind::Track,
                EntityKind::Album,
                EntityKind::Playlist,
                EntityKind::Video,
                EntityKind::Artist,
            ],
        }
    }

    pub fn supports(&self, kind: EntityKind) -> bool {
        self.supported_kinds().contains(&kind)
    }
}
impl FromStr for Provider {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match sanitize(s).as_str() {
            "spotify" => Self::Spotify,
            "applemusic" | "apple" | "itunes" => Self::AppleMusic,
            "youtubemusic" | "youtube" | "ytmusic" => Self::YoutubeMusic,
            "soundcloud" => Self::SoundCloud,
            "tidal" => Self::Tidal,
            "deezer" => Self::Deezer,
            _ => exn::bail!(ErrorKind::UnknownProvider(s.to_string())),
        })
    }
}
impl Display for Provider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_tag())
    }
}

/// What a provider link points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Track,
    Album,
    Playlist,
    Video,
    Artist,
}
impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Track => "track",
            EntityKind::Album => "album",
            EntityKind::Playlist => "playlist",
            EntityKind::Video => "video",
            EntityKind::Artist => "artist",
        }
    }

    /// The standardized identifier that cross-references this kind of entity
    /// between providers, if there is one.
    ///
    /// Playlists and artists have no cross-provider identifier and are never
    /// resolved.
    pub fn identifier_kind(&self) -> Option<IdentifierKind> {
        match self {
            EntityKind::Track | EntityKind::Video => Some(IdentifierKind::Isrc),
            EntityKind::Album => Some(IdentifierKind::Upc),
            EntityKind::Playlist | EntityKind::Artist => None,
        }
    }

    pub fn is_resolvable(&self) -> bool {
        self.identifier_kind().is_some()
    }
}
impl FromStr for EntityKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match sanitize(s).as_str() {
            "track" | "song" => Self::Track,
            "album" | "release" => Self::Album,
            "playlist" | "sets" | "set" => Self::Playlist,
            "video" | "watch" => Self::Video,
            "artist" => Self::Artist,
            _ => exn::bail!(ErrorKind::UnknownEntityKind(s.to_string())),
        })
    }
}
impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}
