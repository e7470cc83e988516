//! JSON encoding of durable records.
//!
//! Serialization goes through proxy structs so the domain models stay free of
//! serialization concerns, and so the request-local `is_primary` flag can't
//! leak into storage.

use exn::ResultExt;
use serde::{Deserialize, Serialize};
use time::UtcDateTime;

use crosstune_music::{DurableRecord, Identifier, Market, Provider, ProviderResult};

use crate::error::{ErrorKind, Result};

#[derive(Serialize, Deserialize)]
#[cfg_attr(test, derive(Debug, PartialEq))]
struct RecordProxy {
    looked_up_at: i64,
    results: Vec<ResultProxy>,
}

#[derive(Serialize, Deserialize)]
#[cfg_attr(test, derive(Debug, PartialEq))]
struct ResultProxy {
    provider: String,
    artist: String,
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    identifier: Option<String>,
    url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    art_url: Option<String>,
    #[serde(default = "default_market")]
    market: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    is_album: Option<bool>,
}

fn default_market() -> String {
    Market::default().to_string()
}

impl From<&ProviderResult> for ResultProxy {
    fn from(result: &ProviderResult) -> Self {
        Self {
            provider: result.provider.as_tag().to_string(),
            artist: result.artist.clone(),
            title: result.title.clone(),
            identifier: result.identifier.as_ref().map(Identifier::to_string),
            url: result.url.clone(),
            art_url: result.art_url.clone(),
            market: result.market().to_string(),
            is_album: result.is_album,
        }
    }
}
impl TryFrom<ResultProxy> for ProviderResult {
    type Error = crate::error::Error;
    fn try_from(proxy: ResultProxy) -> Result<Self> {
        let provider = proxy
            .provider
            .parse::<Provider>()
            .or_raise(|| ErrorKind::Encoding(format!("unknown provider `{}`", proxy.provider)))?;
        let market = proxy
            .market
            .parse::<Market>()
            .or_raise(|| ErrorKind::Encoding(format!("invalid market `{}`", proxy.market)))?;
        let mut result = ProviderResult::new(provider, proxy.artist, proxy.title, proxy.url).with_market(market);
        if let Some(identifier) = proxy.identifier {
            result = result.with_identifier(identifier);
        }
        if let Some(art_url) = proxy.art_url {
            result = result.with_art_url(art_url);
        }
        if let Some(is_album) = proxy.is_album {
            result = result.with_album(is_album);
        }
        Ok(result)
    }
}

/// Serialize a record to its JSON storage form.
pub fn encode(record: &DurableRecord) -> Result<Vec<u8>> {
    let proxy = RecordProxy {
        looked_up_at: record.looked_up_at.unix_timestamp(),
        results: record.results.iter().map(ResultProxy::from).collect(),
    };
    serde_json::to_vec(&proxy).or_raise(|| ErrorKind::Encoding("failed to serialize record".to_string()))
}

/// Deserialize a record from its JSON storage form.
pub fn decode(bytes: &[u8]) -> Result<DurableRecord> {
    let proxy: RecordProxy =
        serde_json::from_slice(bytes).or_raise(|| ErrorKind::Encoding("stored record is not valid JSON".to_string()))?;
    let looked_up_at = UtcDateTime::from_unix_timestamp(proxy.looked_up_at)
        .or_raise(|| ErrorKind::Encoding(format!("invalid timestamp {}", proxy.looked_up_at)))?;
    let results = proxy.results.into_iter().map(ProviderResult::try_from).collect::<Result<Vec<_>>>()?;
    Ok(DurableRecord::new(looked_up_at, results))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> DurableRecord {
        DurableRecord::new(
            UtcDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
            vec![
                ProviderResult::new(Provider::Spotify, "Rick Astley", "Never Gonna Give You Up", "https://open.spotify.com/track/abc123")
                    .with_identifier("USRC17607839")
                    .with_art_url("https://i.scdn.co/image/1")
                    .with_album(false)
                    .primary(),
                ProviderResult::new(Provider::AppleMusic, "Rick Astley", "Never Gonna Give You Up", "https://music.apple.com/gb/song/1")
                    .with_market("gb".parse().unwrap()),
            ],
        )
    }

    #[test]
    fn test_encoding_never_contains_primary_flag() {
        let json = String::from_utf8(encode(&record()).unwrap()).unwrap();
        assert!(!json.contains("primary"));
        assert!(json.contains(r#""looked_up_at":1700000000"#));
        assert!(json.contains(r#""provider":"apple-music""#));
    }

    #[test]
    fn test_decode_restores_record() {
        let decoded = decode(&encode(&record()).unwrap()).unwrap();
        assert_eq!(decoded, record());
        assert!(decoded.results.iter().all(|r| !r.is_primary));
        assert_eq!(decoded.results[1].market().as_str(), "gb");
        assert_eq!(decoded.results[1].is_album, None);
    }

    #[test]
    fn test_decode_applies_defaults() {
        let json = br#"{"looked_up_at":0,"results":[{"provider":"tidal","artist":"a","title":"t","url":"https://tidal.com/track/1"}]}"#;
        let decoded = decode(json).unwrap();
        assert_eq!(decoded.results[0].market(), Market::US);
        assert_eq!(decoded.results[0].identifier, None);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(&*decode(b"not json").unwrap_err(), ErrorKind::Encoding(_)));
        let unknown = br#"{"looked_up_at":0,"results":[{"provider":"napster","artist":"a","title":"t","url":"u"}]}"#;
        assert!(matches!(&*decode(unknown).unwrap_err(), ErrorKind::Encoding(_)));
    }
}
